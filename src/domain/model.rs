use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Field that uniquely identifies a record across pages and export runs.
pub const PROFILE_ID_FIELD: &str = "profileId";
pub const FETCHED_AT_FIELD: &str = "fetchedAt";

/// One fetched entity (group member or search result) as a flat field map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: HashMap<String, Value>,
}

impl Record {
    pub fn new(data: HashMap<String, Value>) -> Self {
        Self { data }
    }

    /// Builds a record from a JSON object; anything else yields `None`.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(obj) => Some(Self {
                data: obj.into_iter().collect(),
            }),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(field.into(), value.into());
    }

    /// Dedup key, stringified. Empty or null ids count as missing.
    pub fn profile_id(&self) -> Option<String> {
        self.get(PROFILE_ID_FIELD)
            .map(cell_text)
            .filter(|id| !id.trim().is_empty())
    }

    pub fn flag(&self, field: &str) -> bool {
        matches!(self.get(field), Some(Value::Bool(true)))
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn badges(&self) -> Vec<&str> {
        match self.get("badges") {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// Plain-text rendering of a cell, as used for dedup keys.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One page returned by a record source.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    pub records: Vec<Record>,
    pub has_more: bool,
    pub cursor: usize,
    pub fetched_at: DateTime<Utc>,
}

impl RecordBatch {
    pub fn new(records: Vec<Record>, has_more: bool, cursor: usize) -> Self {
        Self {
            records,
            has_more,
            cursor,
            fetched_at: Utc::now(),
        }
    }
}

/// Where the sync engine writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetTarget {
    Existing {
        spreadsheet_id: String,
        sheet_name: String,
    },
    New {
        title: String,
        sheet_name: String,
    },
}

impl SheetTarget {
    pub fn sheet_name(&self) -> &str {
        match self {
            Self::Existing { sheet_name, .. } | Self::New { sheet_name, .. } => sheet_name,
        }
    }

    /// Picks `Existing` when an id is supplied, otherwise a new spreadsheet
    /// titled `title` (or a timestamped default).
    pub fn resolve(spreadsheet_id: Option<String>, title: Option<String>, sheet_name: String) -> Self {
        match spreadsheet_id.filter(|id| !id.trim().is_empty()) {
            Some(spreadsheet_id) => Self::Existing {
                spreadsheet_id,
                sheet_name,
            },
            None => Self::New {
                title: title.unwrap_or_else(default_spreadsheet_title),
                sheet_name,
            },
        }
    }
}

pub fn default_spreadsheet_title() -> String {
    format!("LinkedIn Export - {}", Utc::now().format("%Y-%m-%d %H:%M"))
}

pub fn spreadsheet_url(spreadsheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{}", spreadsheet_id)
}

/// Spreadsheet handle returned by the provider after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSpreadsheet {
    pub spreadsheet_id: String,
    pub spreadsheet_url: String,
}

/// Result of reconciling a record set against one sheet tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub spreadsheet_id: String,
    pub spreadsheet_url: String,
    pub spreadsheet_title: Option<String>,
    pub sheet_name: String,
    pub added: usize,
    pub skipped: usize,
    pub is_new_sheet: bool,
}

impl SyncOutcome {
    pub fn summary(&self) -> String {
        let name = self
            .spreadsheet_title
            .as_deref()
            .unwrap_or(&self.spreadsheet_id);
        let mut summary = format!(
            "{} spreadsheet \"{}\" with {} new rows",
            if self.is_new_sheet { "Created" } else { "Updated" },
            name,
            self.added
        );
        if self.skipped > 0 {
            summary.push_str(&format!(" ({} duplicates skipped)", self.skipped));
        }
        summary
    }
}

/// Result of the JSON file sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonExportOutcome {
    pub file_path: String,
    pub records_exported: usize,
    pub file_size_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SinkReport {
    Sheet(SyncOutcome),
    Json(JsonExportOutcome),
}

/// Counts for one orchestration run. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub fetched: usize,
    pub pages_fetched: usize,
    pub qualified: usize,
    pub sink: SinkReport,
}

impl ExportResult {
    pub fn added(&self) -> usize {
        match &self.sink {
            SinkReport::Sheet(outcome) => outcome.added,
            SinkReport::Json(outcome) => outcome.records_exported,
        }
    }

    pub fn skipped(&self) -> usize {
        match &self.sink {
            SinkReport::Sheet(outcome) => outcome.skipped,
            SinkReport::Json(_) => 0,
        }
    }

    pub fn spreadsheet_url(&self) -> Option<&str> {
        match &self.sink {
            SinkReport::Sheet(outcome) => Some(&outcome.spreadsheet_url),
            SinkReport::Json(_) => None,
        }
    }

    pub fn summary(&self) -> String {
        let head = format!(
            "Fetched {} records in {} pages, {} qualified",
            self.fetched, self.pages_fetched, self.qualified
        );
        match &self.sink {
            SinkReport::Sheet(outcome) => format!("{}; {}", head, outcome.summary()),
            SinkReport::Json(outcome) => format!(
                "{}; wrote {} records to {}",
                head, outcome.records_exported, outcome.file_path
            ),
        }
    }
}

/// One spreadsheet column: header label and the record field feeding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub header: &'static str,
    pub field: &'static str,
}

const fn col(header: &'static str, field: &'static str) -> Column {
    Column { header, field }
}

/// Fixed column order for a record kind. The first column is always the
/// profile id, which the sync engine reads back as the dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub columns: &'static [Column],
}

pub const GROUP_MEMBER_LAYOUT: RecordLayout = RecordLayout {
    columns: &[
        col("Profile ID", PROFILE_ID_FIELD),
        col("First Name", "firstName"),
        col("Last Name", "lastName"),
        col("Full Name", "fullName"),
        col("Headline", "headline"),
        col("Public Identifier", "publicIdentifier"),
        col("Profile URL", "profileUrl"),
        col("Follower Count", "followerCount"),
        col("Is Premium", "isPremium"),
        col("Is Verified", "isVerified"),
        col("Badges", "badges"),
        col("Relationship Status", "relationshipStatus"),
    ],
};

pub const PEOPLE_SEARCH_LAYOUT: RecordLayout = RecordLayout {
    columns: &[
        col("Profile ID", PROFILE_ID_FIELD),
        col("Profile URL", "profileUrl"),
        col("Full Name", "fullName"),
        col("First Name", "firstName"),
        col("Last Name", "lastName"),
        col("Headline", "headline"),
        col("Current Position", "currentPosition"),
        col("Company", "company"),
        col("Location", "location"),
        col("Connection Degree", "connectionDegree"),
        col("Is Premium", "isPremium"),
        col("Is Open To Work", "isOpenToWork"),
        col("Profile Picture", "profilePicture"),
        col("Extracted At", FETCHED_AT_FIELD),
    ],
};

impl RecordLayout {
    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.header.to_string()).collect()
    }

    /// Maps a record onto the fixed column order. Lists are joined with ", ",
    /// missing fields become empty strings.
    pub fn to_row(&self, record: &Record) -> Vec<Value> {
        self.columns
            .iter()
            .map(|column| match record.get(column.field) {
                None | Some(Value::Null) => Value::String(String::new()),
                Some(Value::Array(items)) => Value::String(
                    items.iter().map(cell_text).collect::<Vec<_>>().join(", "),
                ),
                Some(Value::Object(obj)) => Value::String(Value::Object(obj.clone()).to_string()),
                Some(scalar) => scalar.clone(),
            })
            .collect()
    }
}
