//! Readable values exposed for one device, described by a single static table.

use crate::api::Client;
use crate::codes;
use crate::model::Snapshot;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Numeric measurement, NaN when not reported.
    Numeric,
    /// Free text such as the upload timestamp.
    Text,
    InverterType,
    InverterStatus,
}

#[derive(Debug)]
pub struct SensorDescription {
    /// Field name in the `getRealtimeInfo` result.
    pub key: &'static str,
    /// Appended to the device name.
    pub name: &'static str,
    pub friendly_name: Option<&'static str>,
    pub unit: Option<&'static str>,
    pub icon: &'static str,
    pub kind: SensorKind,
    /// Only exposed for devices with a battery.
    pub battery: bool,
}

const fn numeric(
    key: &'static str,
    name: &'static str,
    friendly_name: Option<&'static str>,
    unit: &'static str,
    icon: &'static str,
) -> SensorDescription {
    SensorDescription {
        key,
        name,
        friendly_name,
        unit: Some(unit),
        icon,
        kind: SensorKind::Numeric,
        battery: false,
    }
}

const SOLAR: &str = "mdi:solar-power";
const GRID: &str = "mdi:transmission-tower";
const BATTERY: &str = "mdi:battery";

pub static SENSORS: [SensorDescription; 17] = [
    // Inverter.AC.power.total
    numeric("acpower", "Current Yield", Some("Current Solar Generation"), "W", SOLAR),
    // Inverter.AC.energy.out.daily
    numeric("yieldtoday", "Daily Yield", Some("Daily Solar Yield"), "kWh", SOLAR),
    // Inverter.AC.energy.out.total
    numeric("yieldtotal", "Total Yield", Some("Lifetime Solar Yield"), "kWh", SOLAR),
    // Grid.power.total
    numeric("feedinpower", "Grid Power Total", Some("Current Energy Usage"), "W", GRID),
    // Grid.energy.toGrid.total
    numeric("feedinenergy", "To Grid Yield", Some("Energy To Grid"), "kWh", GRID),
    // Grid.energy.fromGrid.total
    numeric("consumeenergy", "From Grid Yield", Some("Energy From Grid"), "kWh", GRID),
    // Inverter.Meter2.AC.power.total
    numeric("feedinpowerM2", "AC power", None, "W", SOLAR),
    // BMS.energy.SOC
    SensorDescription {
        battery: true,
        ..numeric("soc", "State of charge", Some("Battery Charge Level"), "%", BATTERY)
    },
    // Inverter.AC.EPS.power.R/S/T
    numeric("peps1", "ESP R", None, "W", SOLAR),
    numeric("peps2", "ESP S", None, "W", SOLAR),
    numeric("peps3", "ESP T", None, "W", SOLAR),
    SensorDescription {
        key: "inverterType",
        name: "Inverter type",
        friendly_name: Some("Inverter Type"),
        unit: None,
        icon: SOLAR,
        kind: SensorKind::InverterType,
        battery: false,
    },
    SensorDescription {
        key: "inverterStatus",
        name: "Inverter status",
        friendly_name: Some("Inverter Status"),
        unit: None,
        icon: SOLAR,
        kind: SensorKind::InverterStatus,
        battery: false,
    },
    SensorDescription {
        key: "uploadTime",
        name: "Update time",
        friendly_name: Some("Data Last Updated"),
        unit: None,
        icon: "mdi:clock-outline",
        kind: SensorKind::Text,
        battery: false,
    },
    // Inverter.DC.Battery.power.total
    SensorDescription {
        battery: true,
        ..numeric("batpower", "Battery power", Some("Battery Power"), "W", BATTERY)
    },
    // Inverter.DC.PV.power.MPPT1/2
    numeric("powerdc1", "MPPT 1", None, "W", SOLAR),
    numeric("powerdc2", "MPPT 2", None, "W", SOLAR),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorState {
    Number(f64),
    Text(String),
}

impl SensorState {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SensorState::Number(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }
}

/// One readable value of a device, backed by the shared client snapshot.
pub struct Sensor<'a> {
    description: &'static SensorDescription,
    client: &'a Client,
}

impl<'a> Sensor<'a> {
    pub fn new(description: &'static SensorDescription, client: &'a Client) -> Self {
        Sensor {
            description,
            client,
        }
    }

    pub fn description(&self) -> &'static SensorDescription {
        self.description
    }

    pub fn name(&self) -> String {
        format!("{} {}", self.client.device().name, self.description.name)
    }

    /// State against the current snapshot of the client.
    pub fn state(&self) -> SensorState {
        self.state_in(&self.client.snapshot())
    }

    /// State against `snapshot`, so that several sensors can be read from the same poll.
    pub fn state_in(&self, snapshot: &Snapshot) -> SensorState {
        let key = self.description.key;

        match self.description.kind {
            SensorKind::Numeric => SensorState::Number(snapshot.numeric(key)),
            SensorKind::Text => match snapshot.get(key).and_then(|v| v.as_str()) {
                Some(s) => SensorState::Text(s.to_string()),
                None => SensorState::Number(f64::NAN),
            },
            SensorKind::InverterType => {
                let code = snapshot.code(key).unwrap_or_default();
                SensorState::Text(codes::inverter_type_label(&code).to_string())
            }
            SensorKind::InverterStatus => {
                let code = snapshot.code(key).unwrap_or_default();
                SensorState::Text(codes::inverter_status_label(&code).to_string())
            }
        }
    }

    /// Refresh the shared snapshot if it is stale.
    pub async fn update(&self) {
        self.client.ensure_fresh().await
    }
}

/// All sensors exposed for the device of `client`.
pub fn sensors(client: &Client) -> Vec<Sensor<'_>> {
    let has_battery = client.device().has_battery;

    SENSORS
        .iter()
        .filter(|description| has_battery || !description.battery)
        .map(|description| Sensor::new(description, client))
        .collect()
}
