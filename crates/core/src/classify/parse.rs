//! Lenient decoding of vision-model replies.
//!
//! Replies are supposed to be a bare JSON object but sometimes arrive wrapped
//! in prose or code fences. Anything unusable degrades to the fallback values.

use crate::classify::{Classification, FALLBACK_CONFIDENCE};
use crate::roles::{clamp_unit, Role};
use serde_json::Value;

const RATIO_SUM_TOLERANCE: f64 = 0.25;

/// Parses `content` as a JSON object, falling back to the outermost `{...}` span.
pub fn extract_json_object(content: &str) -> Option<serde_json::Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(content) {
        return Some(map);
    }
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&content[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn first_number(map: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|k| map.get(*k))
        .and_then(as_number)
        .map(clamp_unit)
}

/// Ratios to assume when the model names a role but omits the ratios.
fn default_ratios(role: Role) -> (f64, f64) {
    match role {
        Role::Primary => (1.0, 0.0),
        Role::Supporting => (0.0, 1.0),
        Role::Decorative => (0.0, 0.0),
    }
}

pub fn parse_classification(content: &str) -> Classification {
    let Some(map) = extract_json_object(content) else {
        tracing::debug!("classification reply is not json, using fallback");
        return Classification::fallback();
    };

    let role = match map.get("role") {
        Some(Value::String(s)) => Role::coerce(s),
        Some(other) => Role::coerce(&other.to_string()),
        None => Role::Supporting,
    };

    let confidence = map
        .get("confidence")
        .and_then(as_number)
        .map(clamp_unit)
        .unwrap_or(FALLBACK_CONFIDENCE);

    let explanation = match map.get("explanation") {
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let (default_primary, default_supporting) = default_ratios(role);
    let primary_ratio =
        first_number(&map, &["a_role_ratio", "primary_ratio"]).unwrap_or(default_primary);
    let supporting_ratio =
        first_number(&map, &["b_role_ratio", "supporting_ratio"]).unwrap_or(default_supporting);

    // The two ratios should roughly add up to 1; this is only reported.
    if (primary_ratio + supporting_ratio - 1.0).abs() > RATIO_SUM_TOLERANCE {
        tracing::debug!(
            primary_ratio,
            supporting_ratio,
            "frame ratios do not sum to roughly 1"
        );
    }

    Classification {
        role,
        confidence,
        explanation,
        primary_ratio,
        supporting_ratio,
    }
}

/// Reads `has_talking_head` from a presence reply. Anything else is `false`.
pub fn parse_presence(content: &str) -> bool {
    let Some(map) = extract_json_object(content) else {
        return false;
    };
    match map.get("has_talking_head") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}
