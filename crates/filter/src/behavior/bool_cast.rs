use crate::{
    behavior::{Behavior, Properties},
    error::FilterError,
};
use model::core::value::Value;

/// Stores booleans as `"y"` / `"n"` flags.
#[derive(Debug, Clone)]
pub struct BoolCast {
    properties: Properties,
}

impl BoolCast {
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

fn to_flag(key: &str, value: Value) -> Result<Value, FilterError> {
    let flag = match &value {
        Value::Boolean(b) => *b,
        Value::Int(i) if *i == 0 || *i == 1 => *i == 1,
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "y" | "true" | "1" => true,
            "n" | "false" | "0" => false,
            _ => return Err(conversion(key, &value)),
        },
        _ => return Err(conversion(key, &value)),
    };
    Ok(Value::from(if flag { "y" } else { "n" }))
}

fn from_flag(key: &str, value: Value) -> Result<Value, FilterError> {
    match &value {
        Value::Boolean(_) => Ok(value),
        Value::String(s) if s.eq_ignore_ascii_case("y") => Ok(Value::Boolean(true)),
        Value::String(s) if s.eq_ignore_ascii_case("n") => Ok(Value::Boolean(false)),
        _ => Err(conversion(key, &value)),
    }
}

fn conversion(key: &str, value: &Value) -> FilterError {
    FilterError::ValueConversion {
        property: key.to_string(),
        reason: format!("{value} is not a boolean"),
    }
}

impl Behavior for BoolCast {
    fn name(&self) -> &'static str {
        "bool_cast"
    }

    fn retrieve_property(&self, value: Value, key: &str) -> Result<Value, FilterError> {
        self.properties.map(value, key, |v| from_flag(key, v))
    }

    fn persist_property(&self, value: Value, key: &str) -> Result<Value, FilterError> {
        self.properties.map(value, key, |v| to_flag(key, v))
    }
}

#[cfg(test)]
mod tests {
    use super::BoolCast;
    use crate::{behavior::Behavior, error::FilterError};
    use model::core::value::Value;

    #[test]
    fn test_persist_maps_booleans_and_arrays() {
        let cast = BoolCast::new(["active"]);

        assert_eq!(
            cast.persist_property(Value::Boolean(true), "active").unwrap(),
            Value::from("y")
        );
        assert_eq!(
            cast.persist_property(Value::from(vec!["false", "1"]), "active")
                .unwrap(),
            Value::from(vec!["n", "y"])
        );
    }

    #[test]
    fn test_persist_is_idempotent() {
        let cast = BoolCast::new(["active"]);
        let once = cast.persist_property(Value::Boolean(false), "active").unwrap();
        let twice = cast.persist_property(once.clone(), "active").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_retrieve_reads_flags() {
        let cast = BoolCast::new(["active"]);
        assert_eq!(
            cast.retrieve_property(Value::from("Y"), "active").unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_unknown_text_is_a_conversion_error() {
        let cast = BoolCast::new(["active"]);
        let err = cast.persist_property(Value::from("maybe"), "active").unwrap_err();
        assert!(matches!(
            err,
            FilterError::ValueConversion { property, .. } if property == "active"
        ));
    }

    #[test]
    fn test_unregistered_key_passes_through() {
        let cast = BoolCast::new(["active"]);
        assert_eq!(
            cast.persist_property(Value::from("maybe"), "name").unwrap(),
            Value::from("maybe")
        );
    }
}
