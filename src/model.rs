use serde_json::{Map, Value};

/// Static credentials used to build every request for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token_id: String,
    pub sn: String,
}

#[derive(Debug, Clone)]
pub struct Device {
    /// Display name, used as a prefix for every sensor name.
    pub name: String,
    pub credentials: Credentials,
    /// Whether battery related sensors should be exposed.
    pub has_battery: bool,
}

/// Field set returned by a single successful `getRealtimeInfo` call.
///
/// The API omits fields the inverter model does not report, so a missing key is not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    fields: Map<String, Value>,
}

impl Snapshot {
    pub fn new(fields: Map<String, Value>) -> Self {
        Snapshot { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Reads `name` as a number, returning NaN when it is missing or not numeric.
    pub fn numeric(&self, name: &str) -> f64 {
        match self.fields.get(name) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    /// Reads `name` as a code string. Integer codes are rendered in decimal.
    pub fn code(&self, name: &str) -> Option<String> {
        match self.fields.get(name) {
            Some(Value::String(s)) => Some(s.to_owned()),
            Some(Value::Number(n)) => n.as_u64().map(|v| v.to_string()),
            _ => None,
        }
    }
}
