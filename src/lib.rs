pub mod api;
pub mod codes;
pub mod model;
pub mod sensor;
pub mod settings;

pub use api::{Client, Error};
pub use codes::{inverter_status_label, inverter_type_label};
pub use sensor::{sensors, Sensor, SensorState};
