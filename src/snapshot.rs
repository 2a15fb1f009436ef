use serde::Deserialize;
use serde::Serialize;
use serde::de::Error as _;
use serde_json::Value;

/// Decoded body of the rates endpoint.
///
/// `rates` stays untyped until the transform step so that a malformed
/// `rates` field is reported as a shape problem rather than a decode failure.
/// Key order of the object is preserved.
#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq)]
pub struct RateSnapshot {
    #[serde(rename = "date", default)]
    pub reference_date: Option<String>,
    #[serde(default)]
    pub rates: Option<Value>,
}

impl RateSnapshot {
    /// Decodes a response body. Only a JSON object is accepted; serde would
    /// otherwise read an array positionally as the struct's fields.
    pub fn from_json(text: &str) -> serde_json::Result<RateSnapshot> {
        let body: Value = serde_json::from_str(text)?;
        if !body.is_object() {
            return Err(serde_json::Error::custom(format!(
                "expected a JSON object, got {}",
                json_kind(&body)
            )));
        }
        serde_json::from_value(body)
    }

    pub fn is_empty(&self) -> bool {
        self.reference_date.is_none() && self.rates.is_none()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_api_body_in_order() {
        let body = r#"{"date":"2025-10-22","rates":{"USD":1.0,"EUR":0.85,"GBP":0.73}}"#;

        let snapshot: RateSnapshot = serde_json::from_str(body).unwrap();

        assert_eq!(snapshot.reference_date.as_deref(), Some("2025-10-22"));
        let codes: Vec<&String> = snapshot
            .rates
            .as_ref()
            .and_then(Value::as_object)
            .unwrap()
            .keys()
            .collect();
        assert_eq!(codes, ["USD", "EUR", "GBP"]);
    }

    #[test]
    fn missing_fields_decode_to_none() {
        let snapshot: RateSnapshot = serde_json::from_str("{}").unwrap();

        assert!(snapshot.is_empty());

        let snapshot: RateSnapshot = serde_json::from_str(r#"{"date":"2025-10-22"}"#).unwrap();
        assert!(!snapshot.is_empty());
        assert!(snapshot.rates.is_none());
    }

    #[test]
    fn extra_fields_are_ignored() {
        let body = r#"{"base":"USD","timestamp":1761134400,"rates":{"BGN":1.68}}"#;

        let snapshot: RateSnapshot = serde_json::from_str(body).unwrap();

        assert!(snapshot.reference_date.is_none());
        assert!(snapshot.rates.is_some());
    }

    #[test]
    fn array_bodies_are_rejected() {
        let err = RateSnapshot::from_json("[]").unwrap_err();
        assert!(err.to_string().contains("an array"));

        assert!(RateSnapshot::from_json(r#"["2025-10-22", {"USD": 1.0}]"#).is_err());
    }

    #[test]
    fn scalar_bodies_are_rejected() {
        assert!(RateSnapshot::from_json("null").is_err());
        assert!(RateSnapshot::from_json("\"2025-10-22\"").is_err());
        assert!(RateSnapshot::from_json("42").is_err());
    }

    #[test]
    fn object_bodies_decode() {
        let snapshot =
            RateSnapshot::from_json(r#"{"date":"2025-10-22","rates":{"USD":1.0}}"#).unwrap();

        assert_eq!(snapshot.reference_date.as_deref(), Some("2025-10-22"));
        assert!(snapshot.rates.is_some());
    }
}
