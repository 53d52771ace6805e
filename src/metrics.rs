use prometheus::{Encoder, GaugeVec, TextEncoder};
use solaxcloud_rs::sensor::{sensors, SensorKind, SensorState};
use solaxcloud_rs::{Client, Error};

lazy_static! {
    static ref SENSOR_GAUGE: GaugeVec = register_gauge_vec!(
        opts!("solax_sensor", "numeric value reported by SolaxCloud"),
        &["device", "sensor", "unit"],
    )
    .unwrap();
    static ref INVERTER_INFO_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "solax_inverter_info",
            "inverter type and status, always 1 while data is available",
        ),
        &["device", "inverter_type", "inverter_status"],
    )
    .unwrap();
}

/// Refresh `client` and copy every sensor of its device into the Prometheus registry.
///
/// Sensors missing from the snapshot are removed so that no stale sample is exported.
pub async fn collect(client: &Client) {
    client.ensure_fresh().await;

    let snapshot = client.snapshot();
    let device = &client.device().name;
    let mut inverter_type = String::new();
    let mut inverter_status = String::new();

    for sensor in sensors(client) {
        let description = sensor.description();
        let state = sensor.state_in(&snapshot);

        match (description.kind, state) {
            (SensorKind::Numeric, state) => {
                let labels = [
                    device.as_str(),
                    description.key,
                    description.unit.unwrap_or(""),
                ];
                match state.as_f64() {
                    Some(value) => SENSOR_GAUGE.with_label_values(&labels).set(value),
                    None => {
                        /* not registered yet is fine */
                        let _ = SENSOR_GAUGE.remove_label_values(&labels);
                    }
                }
            }
            (SensorKind::InverterType, SensorState::Text(label)) => inverter_type = label,
            (SensorKind::InverterStatus, SensorState::Text(label)) => inverter_status = label,
            _ => {}
        }
    }

    INVERTER_INFO_GAUGE.reset();
    if !snapshot.is_empty() {
        INVERTER_INFO_GAUGE
            .with_label_values(&[
                device.as_str(),
                inverter_type.as_str(),
                inverter_status.as_str(),
            ])
            .set(1.0);
    }
}

/// Read metrics from Prometheus exporter registry.
pub fn read() -> Result<String, Error> {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode(&metric_families, &mut buffer)
        .or(Err(Error::FormatError))?;
    String::from_utf8(buffer).or(Err(Error::FormatError))
}
