use obi_energy_tracker::coordinator::Coordinator;
use obi_energy_tracker::{sensor, Error};
use prometheus::{Encoder, Gauge, TextEncoder};

lazy_static! {
    static ref METER_READING_GAUGE: Gauge = register_gauge!(opts!(
        "meter_reading",
        format!(
            "total meter reading reported by the energy tracker (in {})",
            sensor::METER_READING_UNIT
        ),
    ))
    .unwrap();
    static ref LAST_UPDATE_SUCCESS_GAUGE: Gauge = register_gauge!(opts!(
        "last_update_success",
        "1 if the last refresh cycle succeeded, 0 otherwise",
    ))
    .unwrap();
}

/// Project the coordinator's last result onto the gauges. The meter reading gauge keeps its
/// previous value when the current result carries no reading.
pub fn update(coordinator: &Coordinator) {
    LAST_UPDATE_SUCCESS_GAUGE.set(if coordinator.last_update_success() {
        1.0
    } else {
        0.0
    });

    let data = coordinator.data();
    log::debug!("Sensor update, data: {:?}", data);

    match data.as_deref().and_then(sensor::meter_reading) {
        Some(reading) => METER_READING_GAUGE.set(reading),
        None => log::debug!("No meter reading in last result"),
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
