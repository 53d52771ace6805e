#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prometheus;
#[macro_use]
extern crate rocket;

use rocket::http::ContentType;
use rocket::{Build, Rocket, State};
use solaxcloud_rs::sensor::{sensors, SensorState};
use solaxcloud_rs::{settings, Client, Error};

mod metrics;

#[derive(serde::Serialize)]
struct SensorView {
    name: String,
    friendly_name: Option<&'static str>,
    unit: Option<&'static str>,
    icon: &'static str,
    state: SensorState,
}

#[get("/metrics")]
async fn metrics_route(client: &State<Client>) -> Result<String, Error> {
    metrics::collect(client).await;
    metrics::read()
}

#[get("/sensors")]
async fn sensors_route(client: &State<Client>) -> Result<(ContentType, String), Error> {
    client.ensure_fresh().await;
    let snapshot = client.snapshot();

    let view: Vec<SensorView> = sensors(client)
        .iter()
        .map(|sensor| {
            let description = sensor.description();
            SensorView {
                name: sensor.name(),
                friendly_name: description.friendly_name,
                unit: description.unit,
                icon: description.icon,
                state: sensor.state_in(&snapshot),
            }
        })
        .collect();

    serde_json::to_string(&view)
        .map(|body| (ContentType::JSON, body))
        .or(Err(Error::FormatError))
}

#[launch]
fn rocket() -> Rocket<Build> {
    env_logger::init();

    let settings = settings::read_settings().unwrap_or_else(|e| {
        log::error!("Configuration error: {}", e);
        std::process::exit(1)
    });

    let client = Client::new(settings.device())
        .map(|client| {
            client
                .with_api_url(settings.api_url.as_str())
                .with_interval(settings.interval())
        })
        .unwrap_or_else(|e| {
            log::error!("Unable to create HTTP client: {}", e);
            std::process::exit(1)
        });

    log::info!(
        "Serving SolaxCloud data for {} (refresh every {}s)",
        settings.name,
        settings.interval
    );

    rocket::build()
        .manage(client)
        .mount("/", routes![metrics_route, sensors_route])
}
