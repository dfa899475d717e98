//! Profile files and pin-set resolution.
//!
//! A profile is a JSON (or YAML) object naming a default numbering mode, a default pin
//! list and any number of named pin sets:
//!
//! ```json
//! {
//!   "mode": "BCM",
//!   "default_pins": [14, 16, 4],
//!   "sets": { "garage": [14, 16], "spi": [10, 9, 11, 8, 7] }
//! }
//! ```
//!
//! Every field is optional and unknown fields are ignored. The document is
//! parsed into a generic [`serde_json::Value`] and checked field by field so
//! that errors name the offending field.

use crate::error::{PinError, Result};
use crate::gpio::map::HEADER_PINS;
use crate::gpio::mode::NumberingMode;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Signal-capable BCM pins shown when nothing else selects pins.
pub const DEFAULT_LOGICAL_PINS: [u8; 21] = [
    2, 3, 4, 14, 15, 16, 17, 18, 27, 22, 23, 24, 25, 5, 6, 12, 13, 19, 26, 20, 21,
];

/// Parsed profile document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    /// Numbering mode used when `--mode` is not given
    pub mode: Option<NumberingMode>,
    /// Pins used when neither explicit pins nor a set name are given
    pub default_pins: Option<Vec<u8>>,
    /// Named pin sets
    pub sets: BTreeMap<String, Vec<u8>>,
}

impl Profile {
    /// Load a profile file; `.yml`/`.yaml` files are read as YAML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PinError::not_found(format!(
                "Profile file not found: {}",
                path.display()
            )));
        }
        let text = fs::read_to_string(path)?;
        let profile = if is_yaml(path) {
            Self::from_yaml_str(&text)?
        } else {
            Self::from_json_str(&text)?
        };
        debug!(
            "loaded profile {}: {} set(s)",
            path.display(),
            profile.sets.len()
        );
        Ok(profile)
    }

    /// Parse a profile from YAML text. An empty document is an empty profile.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let doc: Value = serde_yaml::from_str(text)?;
        match doc {
            Value::Null => Ok(Self::default()),
            doc => Self::from_document(&doc),
        }
    }

    /// Parse a profile from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(text)?;
        Self::from_document(&doc)
    }

    /// Validate a generic key-value document.
    pub fn from_document(doc: &Value) -> Result<Self> {
        let obj = doc.as_object().ok_or_else(|| {
            PinError::invalid_format("Profile file must contain a JSON/YAML object")
        })?;

        let mode = match obj.get("mode") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.parse::<NumberingMode>()?),
            Some(other) => {
                return Err(PinError::invalid_format(format!(
                    "'mode' must be a string, got {}",
                    other
                )))
            }
        };

        let default_pins = match obj.get("default_pins") {
            None | Some(Value::Null) => None,
            Some(v) => Some(pin_list(v, "default_pins")?),
        };

        let sets = match obj.get("sets") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(map)) => parse_sets(map)?,
            Some(other) => {
                return Err(PinError::invalid_format(format!(
                    "'sets' must be an object, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            mode,
            default_pins,
            sets,
        })
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

fn parse_sets(map: &Map<String, Value>) -> Result<BTreeMap<String, Vec<u8>>> {
    map.iter()
        .map(|(name, pins)| Ok((name.clone(), pin_list(pins, &format!("sets.{}", name))?)))
        .collect()
}

fn pin_list(value: &Value, field: &str) -> Result<Vec<u8>> {
    let items = value.as_array().ok_or_else(|| {
        PinError::invalid_format(format!("'{}' must be a list of pin numbers", field))
    })?;
    items.iter().map(|item| pin_number(item, field)).collect()
}

fn pin_number(item: &Value, field: &str) -> Result<u8> {
    let n = match item {
        Value::Number(n) => n.as_u64(),
        // Numeric strings are accepted, "17" is as good as 17.
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    n.and_then(|n| u8::try_from(n).ok()).ok_or_else(|| {
        PinError::invalid_format(format!("'{}' contains an invalid pin: {}", field, item))
    })
}

/// The final pins to operate on, in order, and how to interpret them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPinSet {
    pub pins: Vec<u8>,
    pub mode: NumberingMode,
}

/// Built-in pin list for a numbering mode.
pub fn default_pins(mode: NumberingMode) -> Vec<u8> {
    match mode {
        NumberingMode::Physical => (1..=HEADER_PINS).collect(),
        NumberingMode::Logical => DEFAULT_LOGICAL_PINS.to_vec(),
    }
}

/// Pick the numbering mode: explicit argument, then profile, then logical.
pub fn resolve_mode(explicit: Option<NumberingMode>, profile: &Profile) -> NumberingMode {
    explicit.or(profile.mode).unwrap_or_default()
}

/// Work out which pins a command operates on.
///
/// Explicit pins win and are used verbatim (order and duplicates kept), then
/// a named set from the profile, then the profile's default pins, then the
/// built-in list for `mode`.
pub fn resolve_pins(
    explicit: &[u8],
    set_name: Option<&str>,
    profile: &Profile,
    mode: NumberingMode,
) -> Result<ResolvedPinSet> {
    let pins = if !explicit.is_empty() {
        explicit.to_vec()
    } else if let Some(name) = set_name {
        profile
            .sets
            .get(name)
            .cloned()
            .ok_or_else(|| PinError::not_found(format!("Set '{}' not found in profile", name)))?
    } else if let Some(pins) = &profile.default_pins {
        pins.clone()
    } else {
        default_pins(mode)
    };

    Ok(ResolvedPinSet { pins, mode })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_profile() -> Profile {
        Profile::from_document(&json!({
            "mode": "BOARD",
            "default_pins": [11, 13],
            "sets": { "garage": [14, 16], "spi": [10, 9, 11, 8, 7] },
            "comment": "ignored"
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_full_profile() {
        let profile = sample_profile();
        assert_eq!(profile.mode, Some(NumberingMode::Physical));
        assert_eq!(profile.default_pins, Some(vec![11, 13]));
        assert_eq!(profile.sets["spi"], vec![10, 9, 11, 8, 7]);
    }

    #[test]
    fn test_empty_object_is_valid() {
        assert_eq!(Profile::from_json_str("{}").unwrap(), Profile::default());
    }

    #[test]
    fn test_list_document_is_invalid_format() {
        let res = Profile::from_document(&json!([1, 2, 3]));
        assert!(matches!(res, Err(PinError::InvalidFormat(_))));
    }

    #[test]
    fn test_bad_field_types() {
        assert!(matches!(
            Profile::from_document(&json!({ "default_pins": "17" })),
            Err(PinError::InvalidFormat(_))
        ));
        assert!(matches!(
            Profile::from_document(&json!({ "sets": { "a": [1, -2] } })),
            Err(PinError::InvalidFormat(_))
        ));
        assert!(matches!(
            Profile::from_document(&json!({ "mode": "SIDEWAYS" })),
            Err(PinError::Config(_))
        ));
    }

    #[test]
    fn test_numeric_strings_are_pins() {
        let profile = Profile::from_document(&json!({ "default_pins": ["4", 17] })).unwrap();
        assert_eq!(profile.default_pins, Some(vec![4, 17]));
    }

    #[test]
    fn test_yaml_profile() {
        let profile = Profile::from_yaml_str(
            "mode: BOARD\ndefault_pins: [11, 13]\nsets:\n  garage:\n    - 16\n    - 18\n",
        )
        .unwrap();
        assert_eq!(profile.mode, Some(NumberingMode::Physical));
        assert_eq!(profile.default_pins, Some(vec![11, 13]));
        assert_eq!(profile.sets["garage"], vec![16, 18]);
    }

    #[test]
    fn test_empty_yaml_is_empty_profile() {
        assert_eq!(Profile::from_yaml_str("").unwrap(), Profile::default());
        assert_eq!(Profile::from_yaml_str("# nothing yet\n").unwrap(), Profile::default());
    }

    #[test]
    fn test_yaml_list_is_invalid_format() {
        assert!(matches!(
            Profile::from_yaml_str("- 17\n- 27\n"),
            Err(PinError::InvalidFormat(_))
        ));
        assert!(matches!(
            Profile::from_yaml_str("mode: [unclosed"),
            Err(PinError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_explicit_pins_win() {
        let profile = sample_profile();
        let set = resolve_pins(&[7, 9], Some("garage"), &profile, NumberingMode::Physical).unwrap();
        assert_eq!(set.pins, vec![7, 9]);
    }

    #[test]
    fn test_explicit_pins_keep_duplicates() {
        let set = resolve_pins(&[7, 7, 3], None, &Profile::default(), NumberingMode::Logical)
            .unwrap();
        assert_eq!(set.pins, vec![7, 7, 3]);
    }

    #[test]
    fn test_named_set_then_default_pins() {
        let profile = sample_profile();
        let set = resolve_pins(&[], Some("garage"), &profile, NumberingMode::Logical).unwrap();
        assert_eq!(set.pins, vec![14, 16]);
        let set = resolve_pins(&[], None, &profile, NumberingMode::Logical).unwrap();
        assert_eq!(set.pins, vec![11, 13]);
    }

    #[test]
    fn test_unknown_set_is_not_found() {
        let res = resolve_pins(&[], Some("attic"), &sample_profile(), NumberingMode::Logical);
        assert!(matches!(res, Err(PinError::NotFound(_))));
    }

    #[test]
    fn test_builtin_defaults_per_mode() {
        let profile = Profile::default();
        let board = resolve_pins(&[], None, &profile, NumberingMode::Physical).unwrap();
        assert_eq!(board.pins.len(), 40);
        assert_eq!(board.pins.first(), Some(&1));
        let bcm = resolve_pins(&[], None, &profile, NumberingMode::Logical).unwrap();
        assert_eq!(bcm.pins, DEFAULT_LOGICAL_PINS.to_vec());
    }

    #[test]
    fn test_mode_precedence() {
        let profile = sample_profile();
        assert_eq!(
            resolve_mode(Some(NumberingMode::Logical), &profile),
            NumberingMode::Logical
        );
        assert_eq!(resolve_mode(None, &profile), NumberingMode::Physical);
        assert_eq!(resolve_mode(None, &Profile::default()), NumberingMode::Logical);
    }
}
