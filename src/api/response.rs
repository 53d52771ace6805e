use super::Error;
use crate::model::Snapshot;
use serde_json::Value;

const NO_EXCEPTION: &str = "(no exception message received)";

/// Validate the `getRealtimeInfo` envelope `{"success": bool, "result": {...}, "exception": ...}`
/// and extract the field set from `result`.
///
/// Anything but a boolean `true` in `success` is a rejection carrying the server `exception`.
pub fn realtime_info(value: Value) -> Result<Snapshot, Error> {
    let success = value
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if !success {
        let exception = value
            .get("exception")
            .and_then(Value::as_str)
            .unwrap_or(NO_EXCEPTION);
        return Err(Error::RemoteRejection(exception.to_string()));
    }

    match value.get("result") {
        Some(Value::Object(fields)) => Ok(Snapshot::new(fields.to_owned())),
        _ => Err(Error::InvalidResponse(
            value.to_string(),
            String::from("`result` is not an object"),
        )),
    }
}
