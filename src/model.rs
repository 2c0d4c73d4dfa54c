use serde::Serialize;
use serde_json::Value;

type Wh = f64;

pub const DEFAULT_COUNTRY: &str = "DE";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Bridge {
    pub bridge_id: String,
    pub device_id: String,
}

impl Bridge {
    /// Build a `Bridge` from persisted identifiers. Both have to be present, a lone bridge id
    /// without its sensor is not enough to query device data.
    pub fn from_ids(bridge_id: Option<String>, device_id: Option<String>) -> Option<Bridge> {
        match (bridge_id, device_id) {
            (Some(bridge_id), Some(device_id)) if !bridge_id.is_empty() && !device_id.is_empty() => {
                Some(Bridge {
                    bridge_id,
                    device_id,
                })
            }
            _ => None,
        }
    }
}

/// Login and bridge resolution progress of an API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Unauthenticated,
    /// Logged in. `bridge_id` is known when the bridge has no sensor yet or only the bridge id
    /// was persisted, enough for totals but not for device data.
    Authenticated {
        token: String,
        bridge_id: Option<String>,
    },
    Resolved { token: String, bridge: Bridge },
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        match self {
            Session::Unauthenticated => None,
            Session::Authenticated { token, .. } | Session::Resolved { token, .. } => Some(token),
        }
    }

    /// Token and bridge id, available once the bridge is known with or without its sensor.
    pub fn bridge_id(&self) -> Option<(&str, &str)> {
        match self {
            Session::Authenticated {
                token,
                bridge_id: Some(bridge_id),
            } => Some((token, bridge_id)),
            Session::Resolved { token, bridge } => Some((token, &bridge.bridge_id)),
            _ => None,
        }
    }

    pub fn resolved(&self) -> Option<(&str, &Bridge)> {
        match self {
            Session::Resolved { token, bridge } => Some((token, bridge)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    Energy,
    NegativeEnergy,
}

impl Measure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Measure::Energy => "energy",
            Measure::NegativeEnergy => "negative_energy",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<Wh>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_energy: Option<Wh>,
}

impl Totals {
    pub fn set(&mut self, measure: Measure, value: Wh) {
        match measure {
            Measure::Energy => self.energy = Some(value),
            Measure::NegativeEnergy => self.negative_energy = Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.energy.is_none() && self.negative_energy.is_none()
    }
}

/// Result of one refresh cycle, raw payloads as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchResult {
    pub hourly: Option<Value>,
    pub meter: Option<Value>,
}
