use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::preferences::Preferences;

/// Which saved-profile endpoint a profile lives behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// `/schedules/{id}/`
    Schedule,
    /// `/task-data/{id}/`
    TaskData,
}

impl ProfileKind {
    pub fn path_segment(self) -> &'static str {
        match self {
            ProfileKind::Schedule => "schedules",
            ProfileKind::TaskData => "task-data",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Bin and preferences as stored server-side. The bin stays opaque JSON
/// until it is loaded into a [`crate::Coursebin`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SavedProfile {
    #[serde(default)]
    pub coursebin: Value,
    #[serde(default)]
    pub preference: Preferences,
}
