//! Serde adapters shared by config and result types.

use serde::{Deserialize, Deserializer, Serializer};
use std::fmt::Display;

/// `Duration` as floating-point milliseconds.
///
/// Use with `#[serde(with = "crate::serde_helpers::millis")]`.
pub mod millis {
    use super::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(ms / 1000.0).map_err(serde::de::Error::custom)
    }
}

/// Serialize an optional error through its `Display` impl.
pub fn display_opt<T: Display, S: Serializer>(
    value: &Option<T>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.collect_str(v),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Timed {
        #[serde(with = "super::millis")]
        timeout: Duration,
    }

    #[test]
    fn test_millis_accepts_integers() {
        let parsed: Timed = serde_json::from_str(r#"{"timeout": 2500}"#).unwrap();
        assert_eq!(parsed.timeout, Duration::from_millis(2500));
        assert_eq!(
            serde_json::to_string(&parsed).unwrap(),
            r#"{"timeout":2500.0}"#
        );
    }

    #[test]
    fn test_millis_rejects_negative() {
        assert!(serde_json::from_str::<Timed>(r#"{"timeout": -1}"#).is_err());
    }
}
