use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Identifiers are strings in practice, numbers are accepted and stringified.
fn optional_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) if !s.is_empty() => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        _ => Ok(None),
    }
}

#[derive(Deserialize)]
pub struct Login {
    pub token: Option<String>,
}

pub mod user {
    use super::optional_id;
    use serde::Deserialize;

    #[derive(Deserialize)]
    pub struct Sensor {
        #[serde(default, deserialize_with = "optional_id")]
        pub id: Option<String>,
    }

    #[derive(Deserialize)]
    pub struct Bridge {
        #[serde(default, deserialize_with = "optional_id")]
        pub id: Option<String>,
        #[serde(default)]
        pub sensors: Vec<Sensor>,
    }

    #[derive(Deserialize)]
    pub struct User {
        pub bridge: Option<Bridge>,
    }
}

#[derive(Deserialize)]
pub struct Total {
    pub value: Option<f64>,
}
