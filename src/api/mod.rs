pub mod endpoint;
pub mod error;
pub mod response;

use crate::model::{Device, Snapshot};
pub use error::Error;
use log::{Level, Log, Record};
use serde_json::Value;

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

pub const API_URL: &str = "https://www.solaxcloud.com:9443";

/// Minimum spacing between two successful polls (the API allows at most 10 calls per minute).
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

struct ClientState {
    snapshot: Arc<Snapshot>,
    /// Time of the last poll that produced a snapshot, kept as is when a poll fails.
    last_success: Option<Instant>,
    /// Number of polls performed so far, successful or not.
    attempts: u64,
}

impl ClientState {
    fn needs_refresh(&self, interval: Duration) -> bool {
        self.snapshot.is_empty()
            || self
                .last_success
                .map_or(true, |timestamp| timestamp.elapsed() > interval)
    }
}

/// Rate limited, cached view of the realtime telemetry of one device.
///
/// [`Client::ensure_fresh`] may be called as often as wanted: a network request is only issued
/// when the cached snapshot is empty or older than the refresh interval, and concurrent callers
/// share a single in-flight request.
pub struct Client {
    device: Device,
    api_url: String,
    interval: Duration,
    http: reqwest::Client,
    logger: &'static dyn Log,
    log_target: String,
    state: RwLock<ClientState>,
    in_flight: tokio::sync::Mutex<()>,
}

/// Map a failed request (including non-2xx responses) to Error
///
/// The request URL carries the API token, so it is stripped from the message.
fn map_api_err(error: reqwest::Error) -> Error {
    let error = error.without_url();
    match error.status() {
        Some(http::StatusCode::TOO_MANY_REQUESTS) => Error::RateExceeded(error.to_string()),
        _ => Error::TransportFailure(error.to_string()),
    }
}

impl Client {
    pub fn new(device: Device) -> Result<Self, Error> {
        let http = reqwest::ClientBuilder::new()
            .build()
            .map_err(|e| Error::TransportFailure(e.to_string()))?;

        Ok(Client {
            device,
            api_url: String::from(API_URL),
            interval: REFRESH_INTERVAL,
            http,
            logger: log::logger(),
            log_target: String::from(module_path!()),
            state: RwLock::new(ClientState {
                snapshot: Arc::new(Snapshot::default()),
                last_success: None,
                attempts: 0,
            }),
            in_flight: tokio::sync::Mutex::new(()),
        })
    }

    /// Use another base URL than [`API_URL`].
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Send log records to `logger` under `target` instead of the global logger.
    pub fn with_logger(mut self, logger: &'static dyn Log, target: impl Into<String>) -> Self {
        self.logger = logger;
        self.log_target = target.into();
        self
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll the API unless the cached snapshot is still fresh.
    ///
    /// Never fails: on error the snapshot is cleared, the error is logged and the next call
    /// polls again.
    pub async fn ensure_fresh(&self) {
        let attempts = {
            let state = self.read_state();
            if !state.needs_refresh(self.interval) {
                return;
            }
            state.attempts
        };

        let _in_flight = self.in_flight.lock().await;

        /* Someone else polled while we were waiting for the lock */
        {
            let state = self.read_state();
            if state.attempts != attempts || !state.needs_refresh(self.interval) {
                return;
            }
        }

        let result = self.fetch().await;
        self.apply(result);
    }

    /// Raw value of field `name` in the current snapshot.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.read_state().snapshot.get(name).cloned()
    }

    /// Value of field `name` as a number, NaN when missing.
    pub fn numeric(&self, name: &str) -> f64 {
        self.read_state().snapshot.numeric(name)
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.read_state().snapshot)
    }

    pub fn last_success(&self) -> Option<Instant> {
        self.read_state().last_success
    }

    async fn fetch(&self) -> Result<Snapshot, Error> {
        let url = format!("{}{}", self.api_url, endpoint::REALTIME_INFO);
        let credentials = &self.device.credentials;

        let text = self
            .http
            .get(url)
            .query(&[
                ("tokenId", credentials.token_id.as_str()),
                ("sn", credentials.sn.as_str()),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(map_api_err)?
            .text()
            .await
            .map_err(|e| {
                let e = e.without_url();
                Error::TransportFailure(format!("Error reading API response: {}", e))
            })?;

        self.log(
            Level::Trace,
            format_args!("device: {}, response_text: {}", self.device.name, text),
        );

        let value = serde_json::from_str::<Value>(&text)
            .map_err(|e| Error::InvalidResponse(text.to_owned(), e.to_string()))?;

        response::realtime_info(value)
    }

    fn apply(&self, result: Result<Snapshot, Error>) {
        let mut state = self.write_state();
        state.attempts += 1;

        match result {
            Ok(snapshot) => {
                state.snapshot = Arc::new(snapshot);
                state.last_success = Some(Instant::now());
                drop(state);
                self.log(
                    Level::Info,
                    format_args!("Retrieved new data from SolaxCloud {}", self.device.name),
                );
            }
            Err(e) => {
                state.snapshot = Arc::new(Snapshot::default());
                drop(state);
                self.log(Level::Error, format_args!("{}: {}", self.device.name, e));
            }
        }
    }

    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let record = Record::builder()
            .args(args)
            .level(level)
            .target(&self.log_target)
            .module_path_static(Some(module_path!()))
            .build();

        if self.logger.enabled(record.metadata()) {
            self.logger.log(&record);
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ClientState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ClientState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod test {
    use super::Client;
    use crate::model::{Credentials, Device};
    use log::{Level, Log, Metadata, Record};
    use mockito::{Matcher, Mock, Server};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    const PATH: &str = "/proxy/api/getRealtimeInfo.do";

    #[derive(Default)]
    struct CapturingLogger {
        records: Mutex<Vec<(Level, String)>>,
    }

    impl CapturingLogger {
        fn leak() -> &'static CapturingLogger {
            Box::leak(Box::new(CapturingLogger::default()))
        }

        fn records(&self) -> Vec<(Level, String)> {
            self.records.lock().unwrap().clone()
        }
    }

    impl Log for CapturingLogger {
        fn enabled(&self, metadata: &Metadata<'_>) -> bool {
            metadata.level() <= Level::Info
        }

        fn log(&self, record: &Record<'_>) {
            self.records
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    fn device() -> Device {
        Device {
            name: String::from("Roof"),
            credentials: Credentials {
                token_id: String::from("token"),
                sn: String::from("SN123"),
            },
            has_battery: false,
        }
    }

    fn client(url: &str, logger: &'static CapturingLogger) -> Client {
        Client::new(device())
            .unwrap()
            .with_api_url(url)
            .with_logger(logger, "solax")
    }

    async fn mock(server: &mut Server, body: serde_json::Value, hits: usize) -> Mock {
        server
            .mock("GET", PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("tokenId".into(), "token".into()),
                Matcher::UrlEncoded("sn".into(), "SN123".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn success_replaces_snapshot() {
        let mut server = Server::new_async().await;
        let mock = mock(
            &mut server,
            json!({"success": true, "result": {"acpower": 1234}, "exception": "Query success!"}),
            1,
        )
        .await;
        let logger = CapturingLogger::leak();
        let client = client(&server.url(), logger);

        client.ensure_fresh().await;

        assert_eq!(Some(json!(1234)), client.field("acpower"));
        assert_eq!(1234.0, client.numeric("acpower"));
        assert_eq!(None, client.field("soc"));
        assert!(client.numeric("soc").is_nan());
        assert!(client.last_success().is_some());
        assert_eq!(
            vec![(
                Level::Info,
                String::from("Retrieved new data from SolaxCloud Roof")
            )],
            logger.records()
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejection_clears_snapshot() {
        let mut server = Server::new_async().await;
        let mock = mock(
            &mut server,
            json!({"success": false, "exception": "bad token"}),
            1,
        )
        .await;
        let logger = CapturingLogger::leak();
        let client = client(&server.url(), logger);

        client.ensure_fresh().await;

        assert!(client.snapshot().is_empty());
        assert_eq!(None, client.field("acpower"));
        assert!(client.numeric("acpower").is_nan());
        assert_eq!(None, client.last_success());

        let records = logger.records();
        assert_eq!(1, records.len());
        assert_eq!(Level::Error, records[0].0);
        assert!(records[0].1.contains("bad token"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn transport_failure_matches_rejection() {
        let logger = CapturingLogger::leak();
        /* Nothing listens on port 1 */
        let client = client("http://127.0.0.1:1", logger);

        client.ensure_fresh().await;

        assert!(client.snapshot().is_empty());
        assert_eq!(None, client.field("acpower"));
        assert_eq!(None, client.last_success());

        let records = logger.records();
        assert_eq!(1, records.len());
        assert_eq!(Level::Error, records[0].0);
        assert!(records[0].1.starts_with("Roof: "));
        assert!(!records[0].1.contains("token"));
    }

    #[tokio::test]
    async fn rate_limit_clears_snapshot() {
        let mut server = Server::new_async().await;
        let ok = mock(
            &mut server,
            json!({"success": true, "result": {"acpower": 10}}),
            1,
        )
        .await;
        let logger = CapturingLogger::leak();
        let client = client(&server.url(), logger).with_interval(Duration::from_millis(50));

        client.ensure_fresh().await;
        let first = client.last_success();
        assert!(first.is_some());
        ok.remove_async().await;

        let limited = server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(429)
            .expect(1)
            .create_async()
            .await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        client.ensure_fresh().await;

        assert!(client.snapshot().is_empty());
        assert_eq!(first, client.last_success());

        let records = logger.records();
        assert_eq!(2, records.len());
        assert_eq!(Level::Error, records[1].0);
        assert!(records[1].1.contains("rate limit exceeded"));
        assert!(!records[1].1.contains("token"));
        limited.assert_async().await;
    }

    #[tokio::test]
    async fn success_after_failure_restores_fields() {
        let mut server = Server::new_async().await;
        let rejected = mock(
            &mut server,
            json!({"success": false, "exception": "busy"}),
            1,
        )
        .await;
        let client = client(&server.url(), CapturingLogger::leak());

        client.ensure_fresh().await;
        assert_eq!(None, client.field("acpower"));
        assert_eq!(None, client.last_success());
        rejected.assert_async().await;
        rejected.remove_async().await;

        let ok = mock(
            &mut server,
            json!({"success": true, "result": {"acpower": 7}}),
            1,
        )
        .await;

        client.ensure_fresh().await;

        assert_eq!(Some(json!(7)), client.field("acpower"));
        assert!(client.last_success().is_some());
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn invalid_body_and_server_error_are_failures() {
        let mut server = Server::new_async().await;
        let html = server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>502 Bad Gateway</html>")
            .expect(1)
            .create_async()
            .await;
        let logger = CapturingLogger::leak();
        let client = client(&server.url(), logger);

        client.ensure_fresh().await;
        assert!(client.snapshot().is_empty());
        html.remove_async().await;

        let error = server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        client.ensure_fresh().await;
        assert!(client.snapshot().is_empty());
        assert_eq!(None, client.last_success());
        assert_eq!(2, logger.records().len());
        error.assert_async().await;
    }

    #[tokio::test]
    async fn polls_once_per_interval() {
        let mut server = Server::new_async().await;
        let mock = mock(
            &mut server,
            json!({"success": true, "result": {"acpower": 10}}),
            2,
        )
        .await;
        let client = client(&server.url(), CapturingLogger::leak())
            .with_interval(Duration::from_millis(200));

        client.ensure_fresh().await;
        let first = client.last_success();
        client.ensure_fresh().await;
        assert_eq!(first, client.last_success());

        tokio::time::sleep(Duration::from_millis(300)).await;
        client.ensure_fresh().await;
        assert!(client.last_success() > first);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn default_interval_is_five_minutes() {
        let mut server = Server::new_async().await;
        let mock = mock(
            &mut server,
            json!({"success": true, "result": {"acpower": 10}}),
            1,
        )
        .await;
        let client = client(&server.url(), CapturingLogger::leak());
        assert_eq!(Duration::from_secs(300), client.interval());

        for _ in 0..5 {
            client.ensure_fresh().await;
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failure_keeps_last_success_and_retries() {
        let mut server = Server::new_async().await;
        let ok = mock(
            &mut server,
            json!({"success": true, "result": {"acpower": 10}}),
            1,
        )
        .await;
        let client = client(&server.url(), CapturingLogger::leak())
            .with_interval(Duration::from_millis(100));

        client.ensure_fresh().await;
        let first = client.last_success();
        assert!(first.is_some());
        ok.remove_async().await;

        let rejected = mock(
            &mut server,
            json!({"success": false, "exception": "busy"}),
            2,
        )
        .await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        client.ensure_fresh().await;
        assert!(client.snapshot().is_empty());
        assert_eq!(first, client.last_success());

        /* Empty snapshot, so the next call polls right away */
        client.ensure_fresh().await;
        rejected.assert_async().await;
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_request() {
        let mut server = Server::new_async().await;
        let mock = mock(
            &mut server,
            json!({"success": false, "exception": "bad token"}),
            1,
        )
        .await;
        let client = client(&server.url(), CapturingLogger::leak());

        tokio::join!(client.ensure_fresh(), client.ensure_fresh());

        mock.assert_async().await;
    }
}
