use crate::{
    behavior::{Behavior, Properties},
    error::FilterError,
};
use chrono::{DateTime, Utc};
use model::core::value::Value;

/// Stores timestamps as milliseconds since the Unix epoch.
#[derive(Debug, Clone)]
pub struct MillisecondTimestamp {
    properties: Properties,
}

impl MillisecondTimestamp {
    pub fn new<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            properties: Properties::new(properties),
        }
    }
}

fn to_millis(key: &str, value: Value) -> Result<Value, FilterError> {
    match value {
        Value::Timestamp(ts) => Ok(Value::Int(ts.timestamp_millis())),
        Value::Int(_) => Ok(value),
        Value::String(ref s) => {
            if let Ok(ms) = s.trim().parse::<i64>() {
                return Ok(Value::Int(ms));
            }
            DateTime::parse_from_rfc3339(s.trim())
                .map(|ts| Value::Int(ts.timestamp_millis()))
                .map_err(|e| FilterError::ValueConversion {
                    property: key.to_string(),
                    reason: e.to_string(),
                })
        }
        other => Err(FilterError::ValueConversion {
            property: key.to_string(),
            reason: format!("{other} is not a timestamp"),
        }),
    }
}

fn from_millis(key: &str, value: Value) -> Result<Value, FilterError> {
    match value {
        Value::Int(ms) => DateTime::<Utc>::from_timestamp_millis(ms)
            .map(Value::Timestamp)
            .ok_or_else(|| FilterError::ValueConversion {
                property: key.to_string(),
                reason: format!("{ms} is out of range"),
            }),
        Value::Timestamp(_) => Ok(value),
        other => Err(FilterError::ValueConversion {
            property: key.to_string(),
            reason: format!("{other} is not an epoch millisecond value"),
        }),
    }
}

impl Behavior for MillisecondTimestamp {
    fn name(&self) -> &'static str {
        "millisecond_timestamp"
    }

    fn retrieve_property(&self, value: Value, key: &str) -> Result<Value, FilterError> {
        self.properties.map(value, key, |v| from_millis(key, v))
    }

    fn persist_property(&self, value: Value, key: &str) -> Result<Value, FilterError> {
        self.properties.map(value, key, |v| to_millis(key, v))
    }
}

#[cfg(test)]
mod tests {
    use super::MillisecondTimestamp;
    use crate::behavior::Behavior;
    use chrono::{TimeZone, Utc};
    use model::core::value::Value;

    #[test]
    fn test_persist_timestamp_and_rfc3339() {
        let behavior = MillisecondTimestamp::new(["created_at"]);
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        assert_eq!(
            behavior
                .persist_property(Value::Timestamp(ts), "created_at")
                .unwrap(),
            Value::Int(1_704_164_645_000)
        );
        assert_eq!(
            behavior
                .persist_property(Value::from("2024-01-02T03:04:05Z"), "created_at")
                .unwrap(),
            Value::Int(1_704_164_645_000)
        );
    }

    #[test]
    fn test_retrieve_round_trips() {
        let behavior = MillisecondTimestamp::new(["created_at"]);
        let ts = Utc.with_ymd_and_hms(2020, 6, 30, 12, 0, 0).unwrap();

        let stored = behavior
            .persist_property(Value::Timestamp(ts), "created_at")
            .unwrap();
        assert_eq!(
            behavior.retrieve_property(stored, "created_at").unwrap(),
            Value::Timestamp(ts)
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        let behavior = MillisecondTimestamp::new(["created_at"]);
        assert!(
            behavior
                .persist_property(Value::from("yesterday"), "created_at")
                .is_err()
        );
    }
}
