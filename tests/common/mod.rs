#![allow(dead_code)]

use async_trait::async_trait;
use leads_export::domain::model::{spreadsheet_url, CreatedSpreadsheet, Record};
use leads_export::domain::ports::SpreadsheetProvider;
use leads_export::{ExportError, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Spreadsheet provider backed by memory. Clones share the same sheets, so a
/// test can keep a handle while the engine owns another.
#[derive(Clone, Default)]
pub struct InMemorySheets {
    sheets: Arc<Mutex<HashMap<String, Vec<Vec<Value>>>>>,
    append_calls: Arc<Mutex<usize>>,
}

impl InMemorySheets {
    pub fn seed(&self, spreadsheet_id: &str, rows: Vec<Vec<Value>>) {
        self.sheets
            .lock()
            .unwrap()
            .insert(spreadsheet_id.to_string(), rows);
    }

    pub fn rows(&self, spreadsheet_id: &str) -> Vec<Vec<Value>> {
        self.sheets
            .lock()
            .unwrap()
            .get(spreadsheet_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn ids(&self, spreadsheet_id: &str) -> Vec<String> {
        self.rows(spreadsheet_id)
            .iter()
            .skip(1)
            .filter_map(|row| row.first().and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    pub fn append_calls(&self) -> usize {
        *self.append_calls.lock().unwrap()
    }
}

#[async_trait]
impl SpreadsheetProvider for InMemorySheets {
    async fn create_spreadsheet(
        &self,
        title: &str,
        _sheet_name: &str,
        headers: &[String],
    ) -> Result<CreatedSpreadsheet> {
        let id = format!("mem-{}", title.to_lowercase().replace(' ', "-"));
        let header_row = headers.iter().map(|h| json!(h)).collect();
        self.seed(&id, vec![header_row]);
        Ok(CreatedSpreadsheet {
            spreadsheet_url: spreadsheet_url(&id),
            spreadsheet_id: id,
        })
    }

    async fn read_values(&self, spreadsheet_id: &str, _sheet_name: &str) -> Result<Vec<Vec<Value>>> {
        self.sheets
            .lock()
            .unwrap()
            .get(spreadsheet_id)
            .cloned()
            .ok_or_else(|| ExportError::SheetRead {
                status: Some(404),
                message: format!("spreadsheet {} not found", spreadsheet_id),
            })
    }

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        _sheet_name: &str,
        rows: &[Vec<Value>],
    ) -> Result<()> {
        *self.append_calls.lock().unwrap() += 1;
        self.sheets
            .lock()
            .unwrap()
            .entry(spreadsheet_id.to_string())
            .or_default()
            .extend(rows.iter().cloned());
        Ok(())
    }
}

pub fn member(id: &str, premium: bool) -> Value {
    json!({
        "profileId": id,
        "firstName": format!("First {}", id),
        "lastName": format!("Last {}", id),
        "fullName": format!("First {} Last {}", id, id),
        "headline": "Engineer at Example",
        "publicIdentifier": id.to_lowercase(),
        "profileUrl": format!("https://www.linkedin.com/in/{}", id.to_lowercase()),
        "followerCount": 100,
        "isPremium": premium,
        "isVerified": false,
        "badges": if premium { json!(["premium"]) } else { json!([]) },
        "relationshipStatus": "NOT_CONNECTED",
        "creator": false
    })
}

pub fn record(value: Value) -> Record {
    Record::from_json(value).unwrap()
}
