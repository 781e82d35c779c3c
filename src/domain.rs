use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HarvestError;

/// One element of the remote feed. Keeps every field as received so unmapped
/// fields can later be folded into extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct FeedEntry {
    uuid: String,
    fields: Map<String, Value>,
}

impl FeedEntry {
    pub const UUID_FIELD: &'static str = "UUID";

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn require_str(&self, key: &str) -> Result<&str, HarvestError> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| HarvestError::MissingField(key.to_string()))
    }

    pub fn title(&self) -> Result<&str, HarvestError> {
        self.require_str("title")
    }

    pub fn darwin_core_archive(&self) -> Result<&str, HarvestError> {
        self.require_str("darwinCoreArchive")
    }

    /// Parses the content captured on a work item.
    pub fn from_content(content: &str) -> Result<Self, HarvestError> {
        serde_json::from_str(content).map_err(|err| HarvestError::InvalidContent(err.to_string()))
    }

    pub fn to_content(&self) -> Result<String, HarvestError> {
        serde_json::to_string(self).map_err(|err| HarvestError::InvalidContent(err.to_string()))
    }
}

impl TryFrom<Map<String, Value>> for FeedEntry {
    type Error = HarvestError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let uuid = match fields.get(Self::UUID_FIELD) {
            Some(Value::String(uuid)) if !uuid.trim().is_empty() => uuid.clone(),
            _ => return Err(HarvestError::MissingField(Self::UUID_FIELD.to_string())),
        };
        Ok(Self { uuid, fields })
    }
}

impl From<FeedEntry> for Map<String, Value> {
    fn from(entry: FeedEntry) -> Self {
        entry.fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(String);

impl WorkItemId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestSource {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub config: Option<String>,
}

impl HarvestSource {
    pub fn feed_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestJob {
    pub id: String,
    pub source: HarvestSource,
    pub created_at: DateTime<Utc>,
}

impl HarvestJob {
    pub fn new(source: HarvestSource) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source,
            created_at: Utc::now(),
        }
    }
}

/// A work item before it has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkItem {
    pub guid: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub guid: String,
    pub job_id: String,
    pub content: String,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// One data row of the taxa table, keyed by header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TreatmentRow(BTreeMap<String, String>);

impl TreatmentRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn scientific_name(&self) -> Option<&str> {
        self.get("scientificName")
    }

    pub fn references(&self) -> Option<&str> {
        self.get("references")
    }
}

impl FromIterator<(String, String)> for TreatmentRow {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub resource_type: String,
    pub format: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extra {
    pub key: String,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DestinationRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,
    pub maintainer: String,
    pub maintainer_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_org: Option<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub extras: Vec<Extra>,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl DestinationRecord {
    pub fn extra(&self, key: &str) -> Option<&Extra> {
        self.extras.iter().find(|extra| extra.key == key)
    }
}

/// The source's own catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default)]
    pub owner_org: Option<String>,
}

impl SourceRecord {
    pub fn harvest_source(&self) -> HarvestSource {
        HarvestSource {
            id: self.id.clone(),
            url: self.url.clone(),
            config: self.config.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    pub id: String,
    pub name: String,
    pub title: String,
}
