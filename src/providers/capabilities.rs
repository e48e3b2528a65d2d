//! Per-model-family knowledge of which request parameters are safe to send.
//!
//! All "this model family rejects *that* parameter" logic lives here and
//! nowhere else. The filter works in two directions:
//!
//! - **Proactively**: [`filter_for_model`] strips known-unsupported keys
//!   before the first send, using a static family-pattern table.
//! - **Reactively**: [`classify_bad_request`] inspects an HTTP 400 body
//!   and names the rejected parameter, so the adapter can strip it (and
//!   its group) and retry exactly once.
//!
//! Provider error formats are not a stable contract; the reactive path is
//! deliberately best-effort string matching.

use serde_json::Value;

/// Related parameters that are removed together.
///
/// Providers that reject one sampling knob generally reject them all, and
/// resending the rest after a rejection just burns an attempt on the same
/// 400. The same holds for tool-calling and response-format knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamGroup {
    Sampling,
    ResponseFormat,
    Tools,
}

impl ParamGroup {
    /// Payload keys belonging to this group, across both OpenAI-style
    /// protocols (unknown keys are ignored by `strip_group`).
    fn members(self) -> &'static [&'static str] {
        match self {
            ParamGroup::Sampling => &["temperature", "top_p", "top_k", "seed"],
            // "text" carries the format block on the responses protocol,
            // "response_format" on chat completions.
            ParamGroup::ResponseFormat => &["response_format", "text"],
            ParamGroup::Tools => &["tools", "tool_choice", "parallel_tool_calls"],
        }
    }
}

/// Group membership for a recognized optional parameter name.
pub fn group_for(param: &str) -> Option<ParamGroup> {
    match param {
        "temperature" | "top_p" | "top_k" | "seed" => Some(ParamGroup::Sampling),
        "response_format" | "text" | "text.format" => Some(ParamGroup::ResponseFormat),
        "tools" | "tool_choice" | "parallel_tool_calls" => Some(ParamGroup::Tools),
        _ => None,
    }
}

/// Static table of model families with known parameter restrictions.
///
/// A pattern matches the model id itself or any `{pattern}-...` variant.
struct FamilyRule {
    pattern: &'static str,
    strips: &'static [ParamGroup],
}

const FAMILY_RULES: &[FamilyRule] = &[
    // Reasoning families reject sampling knobs outright and (for the
    // oldest of them) structured response formats and tools.
    FamilyRule {
        pattern: "o1",
        strips: &[
            ParamGroup::Sampling,
            ParamGroup::ResponseFormat,
            ParamGroup::Tools,
        ],
    },
    FamilyRule {
        pattern: "o3",
        strips: &[ParamGroup::Sampling],
    },
    FamilyRule {
        pattern: "o4-mini",
        strips: &[ParamGroup::Sampling],
    },
];

fn family_matches(model: &str, pattern: &str) -> bool {
    model == pattern
        || model
            .strip_prefix(pattern)
            .is_some_and(|rest| rest.starts_with('-'))
}

/// Proactively strip parameters the model's family is known to reject.
///
/// Returns the names of the removed keys (empty for unrestricted models).
pub fn filter_for_model(payload: &mut Value, model: &str) -> Vec<String> {
    let mut removed = Vec::new();
    for rule in FAMILY_RULES {
        if !family_matches(model, rule.pattern) {
            continue;
        }
        for group in rule.strips {
            removed.extend(strip_group(payload, *group));
        }
    }
    removed
}

/// Remove every key of `group` present in the payload, returning the
/// names actually removed.
pub fn strip_group(payload: &mut Value, group: ParamGroup) -> Vec<String> {
    let Some(map) = payload.as_object_mut() else {
        return Vec::new();
    };
    group
        .members()
        .iter()
        .filter(|key| map.remove(**key).is_some())
        .map(|key| (*key).to_string())
        .collect()
}

/// Message fragments that mark a 400 as a parameter rejection rather
/// than a generic bad request.
const REJECTION_TOKENS: &[&str] = &[
    "unsupported",
    "unknown parameter",
    "unrecognized",
    "invalid_request_error",
];

/// Inspect an HTTP 400 body and name the rejected parameter, if any.
///
/// Prefers the structured `error.param` field; falls back to scanning the
/// error message for a recognized parameter name once a rejection token
/// matches. Returns `None` for 400s that are not parameter rejections.
pub fn classify_bad_request(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let error = parsed.get("error").unwrap_or(&Value::Null);

    if let Some(param) = error.get("param").and_then(Value::as_str) {
        // Normalize dotted paths like "text.format" to the top-level key.
        let top = param.split('.').next().unwrap_or(param);
        if group_for(top).is_some() {
            return Some(top.to_string());
        }
    }

    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(body)
        .to_ascii_lowercase();
    let error_type = error.get("type").and_then(Value::as_str).unwrap_or("");

    let looks_rejected = REJECTION_TOKENS
        .iter()
        .any(|t| message.contains(t) || error_type.contains(t));
    if !looks_rejected {
        return None;
    }

    // Longest names first so "tool_choice" wins over "tools" etc.
    const KNOWN: &[&str] = &[
        "parallel_tool_calls",
        "response_format",
        "tool_choice",
        "temperature",
        "top_p",
        "top_k",
        "tools",
        "seed",
        "text",
    ];
    KNOWN
        .iter()
        .find(|param| message.contains(*param))
        .map(|param| (*param).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn o1_family_strips_sampling_and_format() {
        let mut payload = json!({
            "model": "o1-mini",
            "input": "hello",
            "temperature": 0.0,
            "text": {"format": {"type": "json_object"}},
            "tools": [],
        });
        let removed = filter_for_model(&mut payload, "o1-mini");
        assert!(removed.contains(&"temperature".to_string()));
        assert!(removed.contains(&"text".to_string()));
        assert!(removed.contains(&"tools".to_string()));
        assert!(payload.get("temperature").is_none());
        assert_eq!(payload["input"], "hello");
    }

    #[test]
    fn unrestricted_model_untouched() {
        let mut payload = json!({"model": "gpt-4o", "temperature": 0.2});
        let removed = filter_for_model(&mut payload, "gpt-4o");
        assert!(removed.is_empty());
        assert_eq!(payload["temperature"], 0.2);
    }

    #[test]
    fn family_match_requires_boundary() {
        // "o1000" is not the o1 family.
        let mut payload = json!({"temperature": 0.1});
        assert!(filter_for_model(&mut payload, "o1000").is_empty());
        assert!(!filter_for_model(&mut payload, "o1-preview").is_empty());
    }

    #[test]
    fn classify_uses_param_field() {
        let body = r#"{"error":{"message":"Unsupported parameter: temperature","param":"temperature"}}"#;
        assert_eq!(classify_bad_request(body).as_deref(), Some("temperature"));
    }

    #[test]
    fn classify_normalizes_dotted_param() {
        let body = r#"{"error":{"message":"Unknown parameter","param":"text.format"}}"#;
        assert_eq!(classify_bad_request(body).as_deref(), Some("text"));
    }

    #[test]
    fn classify_falls_back_to_message_heuristic() {
        let body = r#"{"error":{"message":"Unrecognized request argument supplied: response_format","type":"invalid_request_error"}}"#;
        assert_eq!(
            classify_bad_request(body).as_deref(),
            Some("response_format")
        );
    }

    #[test]
    fn classify_ignores_unrelated_400() {
        let body = r#"{"error":{"message":"This model's maximum context length is exceeded","type":"invalid_request_error"}}"#;
        assert_eq!(classify_bad_request(body), None);

        let body = r#"{"error":{"message":"missing required field"}}"#;
        assert_eq!(classify_bad_request(body), None);
    }

    #[test]
    fn classify_survives_non_json_body() {
        assert_eq!(classify_bad_request("Bad Request"), None);
    }

    #[test]
    fn strip_group_removes_related_knobs_together() {
        let mut payload = json!({
            "temperature": 0.0,
            "top_p": 0.9,
            "tools": [],
        });
        let removed = strip_group(&mut payload, ParamGroup::Sampling);
        assert_eq!(removed.len(), 2);
        assert!(payload.get("temperature").is_none());
        assert!(payload.get("top_p").is_none());
        assert!(payload.get("tools").is_some());
    }
}
