use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Structured result returned by a capability handler.
///
/// The named fields are the ones the router and validator look at;
/// everything else a handler returns is kept in `extra` and passed through
/// to the caller untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerOutput {
    /// Error marker. Non-string values are stringified.
    #[serde(
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Service / category the handler answered for (e.g. "ec2").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Value>,
    /// Free-text answer (general-purpose handler).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Handler output that was not valid JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl HandlerOutput {
    /// Output carrying only a free-text answer.
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            ..Self::default()
        }
    }

    /// Output carrying only an error marker.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Parse handler text output: JSON objects become structured output,
    /// anything else is wrapped as `raw_output`.
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value @ Value::Object(_)) => Self::from_value(value),
            _ => Self {
                raw_output: Some(text.to_string()),
                ..Self::default()
            },
        }
    }

    /// Convert a JSON value. Each named field is decoded on its own; a
    /// value of an unexpected type stays in `extra` and leaves the other
    /// fields intact.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut map) => Self {
                error: take_field(&mut map, "error", |v| match v {
                    Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                }),
                success: take_field(&mut map, "success", Value::as_bool),
                service: take_field(&mut map, "service", |v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                }),
                count: take_field(&mut map, "count", |v| {
                    v.as_u64()
                        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
                }),
                resources: take_field(&mut map, "resources", |v| Some(v.clone())),
                diagnostics: take_field(&mut map, "diagnostics", |v| Some(v.clone())),
                recommendations: take_field(&mut map, "recommendations", |v| Some(v.clone())),
                response: take_field(&mut map, "response", |v| v.as_str().map(str::to_string)),
                raw_output: take_field(&mut map, "raw_output", |v| {
                    v.as_str().map(str::to_string)
                }),
                extra: map,
            },
            Value::String(s) => Self {
                raw_output: Some(s),
                ..Self::default()
            },
            other => Self {
                raw_output: Some(other.to_string()),
                ..Self::default()
            },
        }
    }

    /// Whether the handler signalled failure inside its result.
    pub fn has_error(&self) -> bool {
        self.error.is_some() || self.success == Some(false)
    }

    /// The error text, or a generic message when only `success=false` was set.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "Unknown error".to_string())
    }

    pub fn has_service(&self) -> bool {
        self.service.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    pub fn has_resources(&self) -> bool {
        self.resources.as_ref().is_some_and(is_non_empty)
    }

    pub fn has_diagnostics(&self) -> bool {
        self.diagnostics.as_ref().is_some_and(is_non_empty)
    }

    pub fn has_recommendations(&self) -> bool {
        self.recommendations.as_ref().is_some_and(is_non_empty)
    }

    /// True when the output carries nothing a caller could read.
    pub fn is_blank(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().is_none_or(|t| t.trim().is_empty());
        blank(&self.response)
            && blank(&self.raw_output)
            && self.error.is_none()
            && !self.has_service()
            && self.count.is_none()
            && !self.has_resources()
            && !self.has_diagnostics()
            && !self.has_recommendations()
            && self.extra.is_empty()
    }
}

/// Remove `key` from `map` when `convert` accepts its value. Nulls are
/// dropped; rejected values are left in place.
fn take_field<T>(
    map: &mut Map<String, Value>,
    key: &str,
    convert: impl FnOnce(&Value) -> Option<T>,
) -> Option<T> {
    let converted = match map.get(key)? {
        Value::Null => None,
        value => Some(convert(value)?),
    };
    map.remove(key);
    converted
}

/// Truthiness of a JSON value: null, false, 0, and empty containers are empty.
fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Verdict of the response validator on one handler output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_relevant: bool,
    pub confidence: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl ValidationResult {
    pub fn relevant(confidence: f64) -> Self {
        Self {
            is_relevant: true,
            confidence,
            reasons: Vec::new(),
        }
    }

    pub fn irrelevant(confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            is_relevant: false,
            confidence,
            reasons: vec![reason.into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_text_parses_json_object() {
        let out =
            HandlerOutput::from_text(r#"{"service": "ec2", "count": 0, "region": "us-east-1"}"#);
        assert_eq!(out.service.as_deref(), Some("ec2"));
        assert_eq!(out.count, Some(0));
        assert_eq!(out.extra["region"], "us-east-1");
        assert!(out.raw_output.is_none());
    }

    #[test]
    fn from_text_wraps_plain_text() {
        let out = HandlerOutput::from_text("You have three buckets.");
        assert_eq!(out.raw_output.as_deref(), Some("You have three buckets."));
        assert!(!out.is_blank());
    }

    #[test]
    fn error_marker_detected() {
        let out = HandlerOutput::from_text(r#"{"error": "AccessDenied", "service": "s3"}"#);
        assert!(out.has_error());
        assert_eq!(out.error_message(), "AccessDenied");
    }

    #[test]
    fn success_false_is_an_error() {
        let out = HandlerOutput::from_value(json!({"success": false}));
        assert!(out.has_error());
        assert_eq!(out.error_message(), "Unknown error");
    }

    #[test]
    fn structured_error_is_stringified() {
        let out = HandlerOutput::from_value(json!({"error": {"code": "Throttling"}}));
        assert!(out.has_error());
        assert!(out.error_message().contains("Throttling"));
    }

    #[test]
    fn mistyped_fields_are_kept_in_extra() {
        let out = HandlerOutput::from_value(json!({"count": "many", "error": "boom"}));
        assert_eq!(out.extra["count"], "many");
        assert_eq!(out.error.as_deref(), Some("boom"));
    }

    #[test]
    fn one_mistyped_field_keeps_the_others() {
        let out = HandlerOutput::from_value(json!({
            "service": "ec2",
            "count": -1,
            "success": "yes",
            "resources": [{"id": "i-1"}],
            "region": "eu-west-1"
        }));
        assert_eq!(out.service.as_deref(), Some("ec2"));
        assert!(out.has_resources());
        assert_eq!(out.count, None);
        assert_eq!(out.success, None);
        assert_eq!(out.extra["count"], -1);
        assert_eq!(out.extra["success"], "yes");
        assert_eq!(out.extra["region"], "eu-west-1");
        assert!(!out.has_error());
    }

    #[test]
    fn numeric_string_count_is_accepted() {
        let out = HandlerOutput::from_value(json!({"service": "ec2", "count": "3"}));
        assert_eq!(out.count, Some(3));
        assert!(out.extra.is_empty());
    }

    #[test]
    fn null_fields_are_dropped() {
        let out = HandlerOutput::from_value(json!({"error": null, "service": null}));
        assert!(!out.has_error());
        assert!(out.extra.is_empty());
        assert!(out.is_blank());
    }

    #[test]
    fn empty_collections_are_not_resources() {
        let out = HandlerOutput::from_value(json!({"resources": [], "diagnostics": {}}));
        assert!(!out.has_resources());
        assert!(!out.has_diagnostics());
        assert!(out.is_blank());
    }

    #[test]
    fn empty_service_is_not_a_service() {
        let out = HandlerOutput::from_value(json!({"service": "  "}));
        assert!(!out.has_service());
    }

    #[test]
    fn serialization_skips_absent_fields() {
        let json = serde_json::to_string(&HandlerOutput::text("hello")).unwrap();
        assert_eq!(json, r#"{"response":"hello"}"#);
    }

    #[test]
    fn validation_constructors() {
        let ok = ValidationResult::relevant(0.8);
        assert!(ok.is_relevant);
        assert!(ok.reasons.is_empty());

        let bad = ValidationResult::irrelevant(0.2, "No service or resources in response");
        assert!(!bad.is_relevant);
        assert_eq!(bad.reasons.len(), 1);
    }
}
