use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PreferenceError {
    #[error("`{value}` is not a time of day (expected HH:MM)")]
    InvalidTime { value: String },
    #[error("`{value}` is not a weight between 0 and 100")]
    InvalidWeight { value: String },
}

/// A block of time the user would rather keep free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedSlot {
    pub key: String,
    pub begin: String,
    pub end: String,
    /// Minimum free length inside `begin..end`, as `H:MM`.
    pub length: String,
    pub weight: u32,
}

/// Scheduling preferences sent along with the bin.
///
/// Keys the client does not model are kept in `extra` so saved profiles
/// survive a load/save cycle unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_weight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub late_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub late_weight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_weight: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved: Vec<ReservedSlot>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Preferences {
    /// Set one preference from its textual form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let value = value.trim();
        match key {
            "early_time" => self.early_time = Some(parse_time(value)?),
            "late_time" => self.late_time = Some(parse_time(value)?),
            "break_time" => self.break_time = Some(parse_time(value)?),
            "early_weight" => self.early_weight = Some(parse_weight(value)?),
            "late_weight" => self.late_weight = Some(parse_weight(value)?),
            "break_weight" => self.break_weight = Some(parse_weight(value)?),
            other => {
                self.extra
                    .insert(other.to_string(), Value::String(value.to_string()));
            }
        }
        Ok(())
    }

    /// Adds `slot`, replacing any slot with the same key. Times are
    /// normalized to `HH:MM`.
    pub fn add_reserved(&mut self, slot: ReservedSlot) -> Result<(), PreferenceError> {
        let slot = ReservedSlot {
            begin: parse_time(slot.begin.trim())?,
            end: parse_time(slot.end.trim())?,
            length: parse_time(slot.length.trim())?,
            weight: parse_weight(&slot.weight.to_string())?,
            ..slot
        };
        self.reserved.retain(|existing| existing.key != slot.key);
        self.reserved.push(slot);
        Ok(())
    }

    pub fn remove_reserved(&mut self, keys: &[String]) -> usize {
        let before = self.reserved.len();
        self.reserved.retain(|slot| !keys.contains(&slot.key));
        before - self.reserved.len()
    }
}

fn parse_time(value: &str) -> Result<String, PreferenceError> {
    let invalid = || PreferenceError::InvalidTime {
        value: value.to_string(),
    };
    let (hours, minutes) = value.split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(format!("{hours:02}:{minutes:02}"))
}

fn parse_weight(value: &str) -> Result<u32, PreferenceError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|weight| *weight <= 100)
        .ok_or_else(|| PreferenceError::InvalidWeight {
            value: value.to_string(),
        })
}
