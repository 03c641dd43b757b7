//! Serde helpers for limits that may be `+inf`
//!
//! JSON has no infinity, so `serde_json` writes non-finite floats as `null`.
//! These helpers read that `null` back as `f64::INFINITY`. Use with
//! `#[serde(with = "crate::types::unbounded")]`, or the `option` submodule
//! together with `#[serde(default)]` for optional fields.

use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

/// `Option<f64>` where an absent field is `None` and `null` is `Some(+inf)`.
pub mod option {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => super::serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(Some(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY)))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Limit {
        #[serde(with = "super")]
        max: f64,
        #[serde(default, skip_serializing_if = "Option::is_none", with = "super::option")]
        life: Option<f64>,
    }

    #[test]
    fn infinity_survives_json() {
        let limit = Limit {
            max: f64::INFINITY,
            life: Some(f64::INFINITY),
        };
        let json = serde_json::to_string(&limit).unwrap();
        assert_eq!(json, r#"{"max":null,"life":null}"#);
        assert_eq!(serde_json::from_str::<Limit>(&json).unwrap(), limit);
    }

    #[test]
    fn finite_and_absent_values_are_untouched() {
        let limit: Limit = serde_json::from_str(r#"{"max":12000.0}"#).unwrap();
        assert_eq!(limit.max, 12000.0);
        assert_eq!(limit.life, None);

        let limit = Limit {
            max: 5.0,
            life: Some(42.5),
        };
        let back: Limit = serde_json::from_str(&serde_json::to_string(&limit).unwrap()).unwrap();
        assert_eq!(back, limit);
    }
}
