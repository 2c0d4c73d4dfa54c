#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prometheus;
#[macro_use]
extern crate rocket;

use obi_energy_tracker::api::Endpoints;
use obi_energy_tracker::coordinator::Coordinator;
use obi_energy_tracker::entry::{self, EntryData};
use obi_energy_tracker::settings;
use obi_energy_tracker::Error;
use rocket::http::{ContentType, Status};
use rocket::State;
use std::sync::Arc;

mod metrics;

/// Structure containing state for API handlers.
pub struct StateData {
    coordinator: Arc<Coordinator>,
    entry_data: EntryData,
    endpoints: Endpoints,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<(ContentType, String), Error> {
    serde_json::to_string_pretty(value)
        .map(|body| (ContentType::JSON, body))
        .or(Err(Error::FormatError))
}

#[get("/metrics")]
async fn metrics_route(state: &State<StateData>) -> Result<String, Error> {
    metrics::update(&state.coordinator);
    metrics::read()
}

#[get("/diagnostics")]
async fn diagnostics_route(state: &State<StateData>) -> Result<(ContentType, String), Error> {
    let diagnostics = entry::diagnostics(&state.entry_data, &state.endpoints).await;
    to_json(&diagnostics)
}

#[get("/totals")]
async fn totals_route(
    state: &State<StateData>,
) -> Result<Result<(ContentType, String), Status>, Error> {
    match state.coordinator.api().totals().await {
        Some(totals) => to_json(&totals).map(Ok),
        None => Ok(Err(Status::ServiceUnavailable)),
    }
}

#[get("/bridge-info")]
async fn bridge_info_route(
    state: &State<StateData>,
) -> Result<(Status, (ContentType, String)), Error> {
    match entry::validate(&state.entry_data, &state.endpoints).await {
        Ok(bridge) => Ok((Status::Ok, to_json(&bridge)?)),
        Err(e) => {
            log::warn!("Bridge lookup failed: {}", e);
            let body = serde_json::json!({ "error": e.code() });
            Ok((Status::UnprocessableEntity, to_json(&body)?))
        }
    }
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let settings = settings::read_settings()?;
    let endpoints = settings.endpoints();

    let mut entry = entry::setup(settings.entry_data(), endpoints.clone()).await?;
    entry.start(settings.interval());

    let state = StateData {
        coordinator: entry.coordinator.clone(),
        entry_data: entry.data.clone(),
        endpoints,
    };

    let result = rocket::build()
        .manage(state)
        .mount(
            "/",
            routes![metrics_route, diagnostics_route, totals_route, bridge_info_route],
        )
        .launch()
        .await
        .map(|_| ());

    entry.unload();
    result.map_err(|e| e.into())
}
