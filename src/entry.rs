//! Lifecycle of a configured account: validation, setup, diagnostics and unload.

use crate::api::{self, Endpoints};
use crate::coordinator::{Coordinator, UpdateFailed};
use crate::model::{self, Bridge, Credentials};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

fn default_country() -> String {
    model::DEFAULT_COUNTRY.to_string()
}

/// Persisted account configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EntryData {
    pub email: String,
    pub password: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub bridge_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

impl EntryData {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            email: self.email.to_owned(),
            password: self.password.to_owned(),
            country: self.country.to_owned(),
        }
    }

    pub fn bridge(&self) -> Option<Bridge> {
        Bridge::from_ids(self.bridge_id.clone(), self.device_id.clone())
    }

    pub fn with_bridge(self, bridge: &Bridge) -> EntryData {
        EntryData {
            bridge_id: Some(bridge.bridge_id.to_owned()),
            device_id: Some(bridge.device_id.to_owned()),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    InvalidAuth,
    NoDevices,
    NotReady(UpdateFailed),
    Api(api::Error),
}

impl SetupError {
    /// Short code shown to the user.
    pub fn code(&self) -> &'static str {
        match self {
            SetupError::InvalidAuth => "invalid_auth",
            SetupError::NoDevices => "no_devices",
            SetupError::NotReady(_) => "not_ready",
            SetupError::Api(_) => "unknown",
        }
    }
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::InvalidAuth => write!(f, "Failed to authenticate with Obi EnergyTracker"),
            SetupError::NoDevices => write!(f, "No bridge with an energy sensor found"),
            SetupError::NotReady(e) => write!(f, "First refresh failed: {}", e),
            SetupError::Api(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SetupError {}

impl From<api::Error> for SetupError {
    fn from(e: api::Error) -> Self {
        SetupError::Api(e)
    }
}

/// Check credentials and look up the bridge with a fresh client, ignoring stored identifiers.
pub async fn validate(data: &EntryData, endpoints: &Endpoints) -> Result<Bridge, SetupError> {
    let mut api = api::api(data.credentials(), None, endpoints.clone())?;

    if !api.login().await {
        return Err(SetupError::InvalidAuth);
    }
    api.bridge_info().await.ok_or(SetupError::NoDevices)
}

/// A set up account with its coordinator and, once started, the polling task.
pub struct Entry {
    pub data: EntryData,
    pub coordinator: Arc<Coordinator>,
    poller: Option<JoinHandle<()>>,
}

/// Log in, resolve the bridge if it is not stored yet and run the first refresh.
pub async fn setup(data: EntryData, endpoints: Endpoints) -> Result<Entry, SetupError> {
    let mut api = api::api(data.credentials(), data.bridge(), endpoints)?
        .with_bridge_id(data.bridge_id.clone());

    if !api.login().await {
        log::error!("Failed to authenticate with Obi EnergyTracker");
        return Err(SetupError::InvalidAuth);
    }

    let bridge = match api.bridge() {
        Some(bridge) => bridge.clone(),
        None => {
            log::info!("No bridge stored for {}, looking it up", data.email);
            api.bridge_info().await.ok_or(SetupError::NoDevices)?
        }
    };
    log::info!(
        "Using bridge {} with device {}",
        bridge.bridge_id,
        bridge.device_id
    );

    let coordinator = Coordinator::new(api);
    coordinator.refresh().await.map_err(SetupError::NotReady)?;

    Ok(Entry {
        data: data.with_bridge(&bridge),
        coordinator: Arc::new(coordinator),
        poller: None,
    })
}

impl Entry {
    /// Start periodic refreshes.
    pub fn start(&mut self, interval: Duration) {
        if self.poller.is_some() {
            log::warn!("Polling already running for {}", self.data.email);
            return;
        }
        self.poller = Some(tokio::spawn(self.coordinator.clone().run(interval)));
    }

    pub fn is_running(&self) -> bool {
        self.poller
            .as_ref()
            .map(|poller| !poller.is_finished())
            .unwrap_or(false)
    }

    /// Stop polling. Returns whether a poller was running.
    pub fn unload(&mut self) -> bool {
        match self.poller.take() {
            Some(poller) => {
                poller.abort();
                log::info!("Unloaded entry for {}", self.data.email);
                true
            }
            None => false,
        }
    }
}

impl Drop for Entry {
    fn drop(&mut self) {
        self.unload();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedactedEntryData {
    pub email: String,
    pub country: String,
    pub bridge_id: Option<String>,
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub config_entry_data: RedactedEntryData,
    pub api_available: bool,
}

/// Entry data without the password plus whether a fresh login currently succeeds.
pub async fn diagnostics(data: &EntryData, endpoints: &Endpoints) -> Diagnostics {
    let api_available = match api::api(data.credentials(), data.bridge(), endpoints.clone()) {
        Ok(mut api) => api.login().await,
        Err(e) => {
            log::debug!("Diagnostics login failed: {}", e);
            false
        }
    };

    Diagnostics {
        config_entry_data: RedactedEntryData {
            email: data.email.to_owned(),
            country: data.country.to_owned(),
            bridge_id: data.bridge_id.clone(),
            device_id: data.device_id.clone(),
        },
        api_available,
    }
}
