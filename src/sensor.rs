use crate::model::FetchResult;
use serde_json::Value;

pub const METER_READING_UNIT: &str = "Wh";

/// Current meter reading (in Wh) from the last fetched `meter` payload.
///
/// A list of records is reduced to its last one. From a record, `energy` is preferred, then
/// `value` of an `energy` measure, then any `value`.
pub fn meter_reading(data: &FetchResult) -> Option<f64> {
    let record = match data.meter.as_ref()? {
        Value::Array(records) => records.last()?,
        record => record,
    };
    let record = record.as_object()?;

    if let Some(energy) = record.get("energy") {
        return energy.as_f64();
    }
    let value = record.get("value")?;
    if record.get("measure").and_then(Value::as_str) == Some("energy") {
        return value.as_f64();
    }
    value.as_f64()
}
