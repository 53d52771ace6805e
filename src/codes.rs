//! Lookup tables for the coded fields of `getRealtimeInfo`.
//!
//! Both lookups are exact: the code must be the plain decimal rendering of a known value,
//! anything else (including `"01"`, `"+1"` or an empty string) is reported as [`UNKNOWN`].

use num_derive::FromPrimitive;
use std::fmt;

pub const UNKNOWN: &str = "Unknown";

/// Inverter model, `inverterType` field (API documentation, table 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum InverterType {
    X1Lx = 1,
    XHybrid = 2,
    X1HybridFit = 3,
    X1BoostAirMini = 4,
    X3HybridFit = 5,
    X3Kilo20Kilo30 = 6,
    X3MicPro = 7,
    X1Smart = 8,
    X1Ac = 9,
    A1Hybrid = 10,
    A1Fit = 11,
    A1Grid = 12,
    J1Ess = 13,
}

impl InverterType {
    pub fn from_code(code: &str) -> Option<Self> {
        parse_code(code).and_then(num::FromPrimitive::from_u64)
    }

    pub fn label(self) -> &'static str {
        match self {
            InverterType::X1Lx => "X1-LX",
            InverterType::XHybrid => "X-Hybrid",
            InverterType::X1HybridFit => "X1-Hybrid/Fit",
            InverterType::X1BoostAirMini => "X1-Boost/Air/Mini",
            InverterType::X3HybridFit => "X3-Hybrid/Fit",
            InverterType::X3Kilo20Kilo30 => "X3-20K/30K",
            InverterType::X3MicPro => "X3-MIC/PRO",
            InverterType::X1Smart => "X1-Smart",
            InverterType::X1Ac => "X1-AC",
            InverterType::A1Hybrid => "A1-Hybrid",
            InverterType::A1Fit => "A1-Fit",
            InverterType::A1Grid => "A1-Grid",
            InverterType::J1Ess => "J1-ESS",
        }
    }
}

impl fmt::Display for InverterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inverter operating mode, `inverterStatus` field (API documentation, table 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum InverterStatus {
    Wait = 100,
    Check = 101,
    Normal = 102,
    Fault = 103,
    PermanentFault = 104,
    Update = 105,
    EpsCheck = 106,
    Eps = 107,
    SelfTest = 108,
    Idle = 109,
    Standby = 110,
    PvWakeUpBat = 111,
    GenCheck = 112,
    GenRun = 113,
}

impl InverterStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        parse_code(code).and_then(num::FromPrimitive::from_u64)
    }

    pub fn label(self) -> &'static str {
        match self {
            InverterStatus::Wait => "Wait Mode",
            InverterStatus::Check => "Check Mode",
            InverterStatus::Normal => "Normal Mode",
            InverterStatus::Fault => "Fault Mode",
            InverterStatus::PermanentFault => "Permanent Fault Mode",
            InverterStatus::Update => "Update Mode",
            InverterStatus::EpsCheck => "EPS Check Mode",
            InverterStatus::Eps => "EPS Mode",
            InverterStatus::SelfTest => "Self-Test Mode",
            InverterStatus::Idle => "Idle Mode",
            InverterStatus::Standby => "Standby Mode",
            InverterStatus::PvWakeUpBat => "Pv Wake Up Bat Mode",
            InverterStatus::GenCheck => "Gen Check Mode",
            InverterStatus::GenRun => "Gen Run Mode",
        }
    }
}

impl fmt::Display for InverterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Human readable inverter model for `code`, or `"Unknown"`.
pub fn inverter_type_label(code: &str) -> &'static str {
    InverterType::from_code(code).map_or(UNKNOWN, InverterType::label)
}

/// Human readable inverter status for `code`, or `"Unknown"`.
pub fn inverter_status_label(code: &str) -> &'static str {
    InverterStatus::from_code(code).map_or(UNKNOWN, InverterStatus::label)
}

/* Only the canonical decimal form matches, so "01" or "+1" never alias "1" */
fn parse_code(code: &str) -> Option<u64> {
    let value: u64 = code.parse().ok()?;
    if value.to_string() == code {
        Some(value)
    } else {
        None
    }
}
