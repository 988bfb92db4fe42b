//! Wire shape of a course fetch response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Timestamp = DateTime<Utc>;

/// Malformed course payloads. The store is never touched when one of these
/// is returned.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CourseDataError {
    #[error("course payload is not a JSON object")]
    NotAnObject,
    #[error("course payload is missing `{0}`")]
    MissingField(&'static str),
    #[error("section {index} of {course} is missing `{field}`")]
    InvalidSection {
        course: String,
        index: usize,
        field: &'static str,
    },
    #[error("section {section_id} appears twice in {course}")]
    DuplicateSection { course: String, section_id: String },
    #[error("`{field}` value `{value}` contains `.`, which separates node id segments")]
    DottedSegment { field: &'static str, value: String },
    #[error("malformed course payload: {0}")]
    Malformed(String),
}

/// One course as returned by `PUT /courses/{term}/{course}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseData {
    #[serde(alias = "identifier")]
    pub name: String,
    pub term: String,
    #[serde(default)]
    pub updated: Option<Timestamp>,
    pub sections: Vec<SectionData>,
}

/// Scheduling payload of a single section.
///
/// Absent fields stay absent when serialized so that a partial payload only
/// overwrites what it actually carries. Fields unknown to the client are kept
/// in `extra` and copied verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionData {
    #[serde(alias = "id")]
    pub section_id: String,
    pub section_type: String,
    /// Meeting days as day indices, `0` being Monday.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_clearance: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CourseData {
    /// Parse a raw response body, reporting the first structural problem.
    pub fn from_value(value: Value) -> Result<Self, CourseDataError> {
        let object = value.as_object().ok_or(CourseDataError::NotAnObject)?;
        let has_name = ["name", "identifier"]
            .iter()
            .any(|key| object.get(*key).and_then(Value::as_str).is_some());
        if !has_name {
            return Err(CourseDataError::MissingField("name"));
        }
        if !object.get("sections").is_some_and(Value::is_array) {
            return Err(CourseDataError::MissingField("sections"));
        }
        let data: CourseData = serde_json::from_value(value)
            .map_err(|err| CourseDataError::Malformed(err.to_string()))?;
        data.validate()?;
        Ok(data)
    }

    /// Checks the invariants the transformer relies on.
    pub fn validate(&self) -> Result<(), CourseDataError> {
        if self.name.trim().is_empty() {
            return Err(CourseDataError::MissingField("name"));
        }
        check_segment("name", &self.name)?;
        for (index, section) in self.sections.iter().enumerate() {
            let missing = if section.section_id.trim().is_empty() {
                Some("section_id")
            } else if section.section_type.trim().is_empty() {
                Some("section_type")
            } else {
                None
            };
            if let Some(field) = missing {
                return Err(CourseDataError::InvalidSection {
                    course: self.name.clone(),
                    index,
                    field,
                });
            }
            check_segment("section_id", &section.section_id)?;
            check_segment("section_type", &section.section_type)?;
        }
        Ok(())
    }
}

/// Node ids join segments with `.`, so a segment must not contain one.
fn check_segment(field: &'static str, value: &str) -> Result<(), CourseDataError> {
    if value.contains('.') {
        return Err(CourseDataError::DottedSegment {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl SectionData {
    pub fn new(section_id: impl Into<String>, section_type: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            section_type: section_type.into(),
            ..Self::default()
        }
    }
}
