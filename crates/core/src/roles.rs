use serde::{Deserialize, Serialize};
use std::fmt;

/// Narrative role of a single frame.
///
/// The wire labels are the editing terms the vision model and downstream
/// consumers use: `A-roll` for the on-camera speaker, `B-roll` for supporting
/// cutaways and `C-roll` for short decorative inserts.
#[derive(
    Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Role {
    #[serde(rename = "A-roll")]
    Primary,
    #[default]
    #[serde(rename = "B-roll")]
    Supporting,
    #[serde(rename = "C-roll")]
    Decorative,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Primary => "A-roll",
            Role::Supporting => "B-roll",
            Role::Decorative => "C-roll",
        }
    }

    /// Maps any label to a role. Unknown labels become `Supporting`.
    pub fn coerce(label: &str) -> Role {
        match label.trim().to_ascii_lowercase().as_str() {
            "a-roll" | "a roll" | "aroll" | "primary" => Role::Primary,
            "c-roll" | "c roll" | "croll" | "decorative" => Role::Decorative,
            "b-roll" | "b roll" | "broll" | "supporting" => Role::Supporting,
            other => {
                tracing::debug!(label = other, "unknown role label, using B-roll");
                Role::Supporting
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-frame classification, in original frame order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FrameRole {
    pub frame: String,
    pub role: Role,
    pub confidence: f64,
    #[serde(rename = "a_role_ratio", default)]
    pub primary_ratio: f64,
    #[serde(rename = "b_role_ratio", default)]
    pub supporting_ratio: f64,
}

impl FrameRole {
    /// Builds a frame with every numeric field clamped into `[0, 1]`.
    pub fn new(
        frame: impl Into<String>,
        role: Role,
        confidence: f64,
        primary_ratio: f64,
        supporting_ratio: f64,
    ) -> Self {
        Self {
            frame: frame.into(),
            role,
            confidence: clamp_unit(confidence),
            primary_ratio: clamp_unit(primary_ratio),
            supporting_ratio: clamp_unit(supporting_ratio),
        }
    }
}

/// Clamps into `[0, 1]`; NaN becomes 0.
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Rounds the exact binary value to three decimals, ties to even.
pub fn round3(v: f64) -> f64 {
    format!("{v:.3}").parse().unwrap_or(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_known_labels() {
        assert_eq!(Role::coerce("A-roll"), Role::Primary);
        assert_eq!(Role::coerce(" b-roll "), Role::Supporting);
        assert_eq!(Role::coerce("C-ROLL"), Role::Decorative);
        assert_eq!(Role::coerce("primary"), Role::Primary);
        assert_eq!(Role::coerce("decorative"), Role::Decorative);
    }

    #[test]
    fn coerce_unknown_label_is_supporting() {
        assert_eq!(Role::coerce("D-roll"), Role::Supporting);
        assert_eq!(Role::coerce(""), Role::Supporting);
    }

    #[test]
    fn role_serializes_as_roll_label() {
        let json = serde_json::to_string(&Role::Primary).unwrap();
        assert_eq!(json, "\"A-roll\"");
        let back: Role = serde_json::from_str("\"C-roll\"").unwrap();
        assert_eq!(back, Role::Decorative);
    }

    #[test]
    fn frame_role_clamps_and_uses_wire_names() {
        let fr = FrameRole::new("f.jpg", Role::Primary, 1.7, -0.2, f64::NAN);
        assert_eq!(fr.confidence, 1.0);
        assert_eq!(fr.primary_ratio, 0.0);
        assert_eq!(fr.supporting_ratio, 0.0);

        let v = serde_json::to_value(&fr).unwrap();
        assert_eq!(v["role"], "A-roll");
        assert!(v.get("a_role_ratio").is_some());
        assert!(v.get("b_role_ratio").is_some());
    }

    #[test]
    fn round3_keeps_three_decimals() {
        assert_eq!(round3(0.12345), 0.123);
        assert_eq!(round3(0.6666666), 0.667);
    }

    #[test]
    fn round3_follows_the_stored_binary_value() {
        // both literals sit just below the decimal tie
        assert_eq!(round3(0.1235), 0.123);
        assert_eq!(round3(1.0005), 1.0);
    }
}
