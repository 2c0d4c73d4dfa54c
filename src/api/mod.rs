pub mod endpoint;
pub mod error;
pub mod interval;
pub mod response;
pub mod token;

use crate::model::{Bridge, Credentials, Measure, Session, Totals};
use chrono::{NaiveDateTime, Utc};
pub use error::Error;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use std::collections::HashMap;

/// Days of hourly data requested when no explicit count is given.
pub const DEFAULT_DAYS: u32 = 1;

const X_APP_TYPE: &str = "x-app-type";
const X_OBI_LOCALE: &str = "x-obi-locale";

/// Base URLs of the two vendor hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login_url: String,
    pub api_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            login_url: endpoint::LOGIN_URL.to_string(),
            api_url: endpoint::API_URL.to_string(),
        }
    }
}

/// Client of the energy tracking backend.
///
/// Holds the login token and the resolved bridge in `session`. Totals need the bridge id, hourly
/// and meter data the full `Session::Resolved`; before that they are no-ops returning `None`.
#[derive(Debug)]
pub struct ObiApi {
    client: reqwest::Client,
    endpoints: Endpoints,
    credentials: Credentials,
    /// Identifiers known before login, e.g. persisted from an earlier bridge lookup.
    known_bridge: Option<Bridge>,
    known_bridge_id: Option<String>,
    session: Session,
}

pub fn api(
    credentials: Credentials,
    known_bridge: Option<Bridge>,
    endpoints: Endpoints,
) -> Result<ObiApi, Error> {
    let client = reqwest::ClientBuilder::new()
        .build()
        .or(Err(Error::InternalError))?;

    let known_bridge_id = known_bridge.as_ref().map(|bridge| bridge.bridge_id.to_owned());

    Ok(ObiApi {
        client,
        endpoints,
        credentials,
        known_bridge,
        known_bridge_id,
        session: Session::Unauthenticated,
    })
}

/// Map failed request to Error
fn map_api_err(error: reqwest::Error) -> Error {
    match error.status() {
        Some(http::StatusCode::UNAUTHORIZED) | Some(http::StatusCode::FORBIDDEN) => {
            Error::LoginError(error.to_string())
        }
        _ => Error::ApiError(error.to_string()),
    }
}

/// Headers the vendor's mobile app sends on login.
pub fn login_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("Keep-Alive"));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        HeaderName::from_static(X_APP_TYPE),
        HeaderValue::from_static("b2c"),
    );
    headers.insert(
        HeaderName::from_static(X_OBI_LOCALE),
        HeaderValue::from_static("de-DE"),
    );
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(endpoint::LOGIN_USER_AGENT),
    );
    headers
}

/// Headers for authenticated backend requests, `accept` selects the vendor media type.
pub fn auth_headers(token: &str, accept: &'static str) -> Result<HeaderMap, Error> {
    let authorization = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| Error::TokenError(e.to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(accept));
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(endpoint::APP_USER_AGENT),
    );
    headers.insert(header::AUTHORIZATION, authorization);
    headers.insert(header::CONNECTION, HeaderValue::from_static("Keep-Alive"));
    Ok(headers)
}

impl ObiApi {
    /// Bridge id persisted without its sensor. Ignored if a full bridge is already known.
    pub fn with_bridge_id(mut self, bridge_id: Option<String>) -> ObiApi {
        if self.known_bridge.is_none() {
            self.known_bridge_id = bridge_id.filter(|id| !id.is_empty());
        }
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn bridge(&self) -> Option<&Bridge> {
        self.session.resolved().map(|(_, bridge)| bridge)
    }

    /// `Ok(None)` if the server accepted the request but sent no token.
    async fn try_login(&self) -> Result<Option<String>, Error> {
        let request_body = HashMap::from([
            ("email", self.credentials.email.to_owned()),
            ("password", self.credentials.password.to_owned()),
            ("country", self.credentials.country.to_owned()),
        ]);

        let response = self
            .client
            .post(&self.endpoints.login_url)
            .headers(login_headers())
            .json(&request_body)
            .send()
            .await
            .map_err(map_api_err)?;

        let status = response.status();
        if status != http::StatusCode::OK {
            return Err(Error::LoginError(format!("server responded {}", status)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::ApiError(format!("Error reading API response: {}", e)))?;

        serde_json::from_str::<response::Login>(&text)
            .map(|login| login.token.filter(|token| !token.is_empty()))
            .map_err(|e| Error::InvalidResponse(text, e.to_string()))
    }

    /// Authenticate with the stored credentials. Returns `false` on any failure, never errors.
    ///
    /// A tokenless answer drops the previous session, a rejected or failed request keeps it.
    pub async fn login(&mut self) -> bool {
        match self.try_login().await {
            Ok(Some(token)) => {
                self.session = match self.known_bridge.clone() {
                    Some(bridge) => Session::Resolved { token, bridge },
                    None => Session::Authenticated {
                        token,
                        bridge_id: self.known_bridge_id.clone(),
                    },
                };
                log::debug!("Successfully authenticated as {}", self.credentials.email);
                true
            }
            Ok(None) => {
                log::error!("No token received from login response");
                self.session = Session::Unauthenticated;
                false
            }
            Err(e) => {
                log::error!("Login error: {}", e);
                false
            }
        }
    }

    /// GET `url` and parse the body as JSON.
    ///
    /// Non-200 responses are logged and reported as `Ok(None)`; transport failures, unreadable or
    /// non-JSON bodies are errors.
    async fn get(
        &self,
        what: &str,
        url: &str,
        token: &str,
        accept: &'static str,
        query: &[(&str, &str)],
    ) -> Result<Option<Value>, Error> {
        let response = self
            .client
            .get(url)
            .headers(auth_headers(token, accept)?)
            .query(query)
            .send()
            .await
            .map_err(map_api_err)?;

        let status = response.status();
        if status != http::StatusCode::OK {
            log::error!("Failed to get {}: {}", what, status);
            return Ok(None);
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::ApiError(format!("Error reading API response: {}", e)))?;

        log::trace!("{}: url: {}, query: {:?}, response_text: {}", what, url, query, text);

        serde_json::from_str::<Value>(&text)
            .map(Some)
            .map_err(|e| Error::InvalidResponse(text, e.to_string()))
    }

    /// Bridge id and the id of its first sensor, if any.
    async fn try_bridge_info(
        &self,
        token: &str,
    ) -> Result<Option<(String, Option<String>)>, Error> {
        let account_id = match token::account_id(token)? {
            Some(account_id) => account_id,
            None => {
                log::error!("No accountId found in token");
                return Ok(None);
            }
        };

        let url = format!("{}{}/{}", self.endpoints.api_url, endpoint::USERS, account_id);
        let value = match self
            .get("user info", &url, token, endpoint::USER_MEDIA_TYPE, &[])
            .await?
        {
            Some(value) => value,
            None => return Ok(None),
        };

        let user = serde_json::from_value::<response::user::User>(value.clone())
            .map_err(|e| Error::InvalidResponse(value.to_string(), e.to_string()))?;

        let bridge = match user.bridge {
            Some(bridge) => bridge,
            None => {
                log::error!("No bridge found in user info");
                return Ok(None);
            }
        };

        let bridge_id = match bridge.id {
            Some(bridge_id) => bridge_id,
            None => {
                log::error!("Could not find bridge_id");
                return Ok(None);
            }
        };
        let device_id = bridge.sensors.into_iter().next().and_then(|sensor| sensor.id);
        Ok(Some((bridge_id, device_id)))
    }

    /// Look up bridge and first sensor of the logged in account and cache them in the session.
    ///
    /// A bridge without sensors is kept as bridge id only, enough for totals, and `None` is
    /// returned.
    pub async fn bridge_info(&mut self) -> Option<Bridge> {
        let token = self.session.token()?.to_owned();

        match self.try_bridge_info(&token).await {
            Ok(Some((bridge_id, Some(device_id)))) => {
                let bridge = Bridge {
                    bridge_id,
                    device_id,
                };
                self.session = Session::Resolved {
                    token,
                    bridge: bridge.clone(),
                };
                Some(bridge)
            }
            Ok(Some((bridge_id, None))) => {
                log::error!("Could not find device_id for bridge {}", bridge_id);
                self.session = Session::Authenticated {
                    token,
                    bridge_id: Some(bridge_id),
                };
                None
            }
            Ok(None) => None,
            Err(e) => {
                log::error!("Error getting bridge info: {}", e);
                None
            }
        }
    }

    /// Lifetime totals of both measures. A measure failing does not affect the other one, `None`
    /// only if neither could be read.
    pub async fn totals(&self) -> Option<Totals> {
        let (token, bridge_id) = self.session.bridge_id()?;
        let url = format!(
            "{}{}/{}/{}",
            self.endpoints.api_url,
            endpoint::HISTORICAL_DATA,
            bridge_id,
            endpoint::TOTAL
        );

        let mut totals = Totals::default();
        for measure in [Measure::Energy, Measure::NegativeEnergy] {
            let response = self
                .get(
                    "totals",
                    &url,
                    token,
                    endpoint::HISTORICAL_RECORD_MEDIA_TYPE,
                    &[("measures", measure.as_str())],
                )
                .await;

            match response {
                Ok(Some(value)) => {
                    log::debug!("{} totals response: {}", measure.as_str(), value);
                    match serde_json::from_value::<response::Total>(value) {
                        Ok(response::Total { value: Some(v) }) => totals.set(measure, v),
                        _ => log::warn!("No value in {} totals response", measure.as_str()),
                    }
                }
                Ok(None) => {}
                Err(e) => log::error!("Error getting {} totals: {}", measure.as_str(), e),
            }
        }

        if totals.is_empty() {
            None
        } else {
            Some(totals)
        }
    }

    /// Hourly `energy` and `negative_energy` for `num_days` starting at 23:00 of `start` (default
    /// now, taken in UTC). `Err` on transport failure, `Ok(None)` on non-200 or before bridge
    /// resolution.
    pub async fn try_hourly_data(
        &self,
        start: Option<NaiveDateTime>,
        num_days: u32,
    ) -> Result<Option<Value>, Error> {
        let (token, bridge) = match self.session.resolved() {
            Some(resolved) => resolved,
            None => return Ok(None),
        };

        let start = start.unwrap_or_else(|| Utc::now().naive_utc());
        let duration = interval::hourly(start, num_days);
        let measures = format!(
            "{},{}",
            Measure::Energy.as_str(),
            Measure::NegativeEnergy.as_str()
        );
        let url = format!(
            "{}{}/{}/{}/{}",
            self.endpoints.api_url,
            endpoint::HISTORICAL_DATA,
            bridge.bridge_id,
            bridge.device_id,
            endpoint::HOURLY
        );

        self.get(
            "hourly data",
            &url,
            token,
            endpoint::HISTORICAL_RECORD_MEDIA_TYPE,
            &[("duration", duration.as_str()), ("measures", measures.as_str())],
        )
        .await
    }

    pub async fn hourly_data(&self, start: Option<NaiveDateTime>, num_days: u32) -> Option<Value> {
        self.try_hourly_data(start, num_days)
            .await
            .unwrap_or_else(|e| {
                log::error!("Error getting hourly data: {}", e);
                None
            })
    }

    /// Meter readings of the last six hours. Same error contract as `try_hourly_data`.
    pub async fn try_meter_data(&self) -> Result<Option<Value>, Error> {
        let (token, bridge) = match self.session.resolved() {
            Some(resolved) => resolved,
            None => return Ok(None),
        };

        let duration = interval::meter(Utc::now());
        let url = format!(
            "{}{}/{}/{}/{}",
            self.endpoints.api_url,
            endpoint::HISTORICAL_DATA,
            bridge.bridge_id,
            bridge.device_id,
            endpoint::METER
        );

        self.get(
            "meter data",
            &url,
            token,
            endpoint::HISTORICAL_RECORD_MEDIA_TYPE,
            &[
                ("duration", duration.as_str()),
                ("measures", Measure::Energy.as_str()),
            ],
        )
        .await
    }

    pub async fn meter_data(&self) -> Option<Value> {
        self.try_meter_data().await.unwrap_or_else(|e| {
            log::error!("Error getting meter data: {}", e);
            None
        })
    }
}
