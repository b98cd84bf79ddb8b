//! ConnectSafely LinkedIn API sources.
//!
//! Every source maps one paged endpoint onto [`RecordSource`]. Page numbers
//! are filled in by the paginator; sources only know the cursor.

use crate::domain::model::{cell_text, Record, RecordBatch};
use crate::domain::ports::RecordSource;
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::OnceLock;

pub const DEFAULT_BASE_URL: &str = "https://api.connectsafely.ai";

/// Shared HTTP plumbing for the ConnectSafely endpoints.
#[derive(Debug, Clone)]
pub struct ConnectSafelyClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl ConnectSafelyClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        }
    }

    async fn post_page(&self, path: &str, body: &Value, cursor: usize) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("POST {} (start={})", url, cursor);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ExportError::source_fetch(
                0,
                cursor,
                Some(status.as_u16()),
                format!("{} {}", status, text.trim()),
            ));
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// Resolves a location name ("San Francisco", "Germany") to the geo ids
    /// people search accepts as `location`.
    pub async fn search_geo(&self, keywords: &str) -> Result<Vec<GeoLocation>> {
        let url = format!("{}/linkedin/search/geo", self.base_url);
        tracing::debug!("POST {} (keywords={})", url, keywords);
        let lookup_error = |status: Option<u16>, message: String| ExportError::LocationLookup {
            status,
            message,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&json!({ "keywords": keywords }))
            .send()
            .await
            .map_err(|e| lookup_error(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| lookup_error(Some(status.as_u16()), e.to_string()))?;
        if !status.is_success() {
            return Err(lookup_error(
                Some(status.as_u16()),
                format!("{} {}", status, text.trim()),
            ));
        }

        let payload: GeoResponse = serde_json::from_str(&text)
            .map_err(|e| lookup_error(None, format!("unexpected geo response: {}", e)))?;
        Ok(payload
            .locations
            .into_iter()
            .filter_map(GeoLocation::from_raw)
            .collect())
    }
}

/// One match from the geo lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeoLocation {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl GeoLocation {
    // geoId wins; an empty or missing geoId falls back to id
    fn from_raw(raw: RawGeoLocation) -> Option<Self> {
        let id = [raw.geo_id, raw.id]
            .into_iter()
            .flatten()
            .map(|v| cell_text(&v))
            .find(|id| !id.is_empty())?;
        Some(Self {
            id,
            name: raw.name,
            country: raw.country.filter(|c| !c.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    locations: Vec<RawGeoLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGeoLocation {
    #[serde(default)]
    geo_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
    #[serde(default)]
    members: Vec<Value>,
    #[serde(default, rename = "hasMore")]
    has_more: bool,
}

fn members_batch(payload: Value, cursor: usize) -> Result<RecordBatch> {
    let response: MembersResponse = serde_json::from_value(payload)?;
    let records = response
        .members
        .into_iter()
        .filter_map(Record::from_json)
        .collect();
    Ok(RecordBatch::new(records, response.has_more, cursor))
}

/// Members of a group addressed by its numeric id.
#[derive(Debug, Clone)]
pub struct GroupMembersSource {
    client: ConnectSafelyClient,
    group_id: String,
}

impl GroupMembersSource {
    pub fn new(client: ConnectSafelyClient, group_id: impl Into<String>) -> Self {
        Self {
            client,
            group_id: group_id.into(),
        }
    }
}

#[async_trait]
impl RecordSource for GroupMembersSource {
    async fn fetch_page(&self, cursor: usize, page_size: usize) -> Result<RecordBatch> {
        let body = json!({
            "groupId": self.group_id,
            "start": cursor,
            "count": page_size,
        });
        let payload = self
            .client
            .post_page("/linkedin/groups/members", &body, cursor)
            .await?;
        members_batch(payload, cursor)
    }

    fn describe(&self) -> String {
        format!("group {}", self.group_id)
    }
}

/// Members of a group addressed by its public URL; the API resolves the id.
#[derive(Debug, Clone)]
pub struct GroupUrlMembersSource {
    client: ConnectSafelyClient,
    group_url: String,
}

impl GroupUrlMembersSource {
    pub fn new(client: ConnectSafelyClient, group_url: impl Into<String>) -> Self {
        Self {
            client,
            group_url: group_url.into(),
        }
    }
}

#[async_trait]
impl RecordSource for GroupUrlMembersSource {
    async fn fetch_page(&self, cursor: usize, page_size: usize) -> Result<RecordBatch> {
        let body = json!({
            "groupUrl": self.group_url,
            "start": cursor,
            "count": page_size,
        });
        let payload = self
            .client
            .post_page("/linkedin/groups/members-by-url", &body, cursor)
            .await?;
        members_batch(payload, cursor)
    }

    fn describe(&self) -> String {
        format!("group {}", self.group_url)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub current_company_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connection_degree: Vec<String>,
}

impl SearchFilters {
    fn is_empty(&self) -> bool {
        self.current_company_ids.is_empty() && self.connection_degree.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeopleSearchQuery {
    pub keywords: String,
    pub location: Option<String>,
    pub title: Option<String>,
    pub filters: SearchFilters,
}

impl PeopleSearchQuery {
    pub fn keywords(keywords: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            ..Self::default()
        }
    }

    /// Managers and recruiters at one company. Without an explicit manager
    /// title the keywords are derived from the job title being applied for.
    pub fn hiring_managers(
        company_id: impl Into<String>,
        job_title: Option<&str>,
        manager_title: Option<&str>,
        connection_degree: Vec<String>,
    ) -> Self {
        let keywords = match manager_title {
            Some(title) if !title.trim().is_empty() => title.to_string(),
            _ => hiring_manager_keywords(job_title).to_string(),
        };
        let connection_degree = if connection_degree.is_empty() {
            vec!["S".to_string(), "O".to_string()]
        } else {
            connection_degree
        };

        Self {
            keywords,
            location: None,
            title: None,
            filters: SearchFilters {
                current_company_ids: vec![company_id.into()],
                connection_degree,
            },
        }
    }
}

pub fn hiring_manager_keywords(job_title: Option<&str>) -> &'static str {
    let title = job_title.unwrap_or_default().to_lowercase();
    if title.contains("engineer") {
        "Engineering Manager OR VP Engineering OR CTO"
    } else if title.contains("sales") {
        "Sales Director OR VP Sales"
    } else if title.contains("marketing") {
        "Marketing Director OR CMO"
    } else {
        "Hiring Manager OR Recruiter"
    }
}

/// Company name pulled out of a headline such as "CTO at Acme | Speaker".
pub fn extract_company(headline: &str) -> String {
    static COMPANY: OnceLock<Regex> = OnceLock::new();
    let re = COMPANY.get_or_init(|| {
        Regex::new(r"(?i)(?:\bat\b|@|\s-\s)\s*([^|]+?)(?:\s*\||$)").expect("company pattern is valid")
    });

    re.captures(headline)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// People search results, normalized to the people search layout.
#[derive(Debug, Clone)]
pub struct PeopleSearchSource {
    client: ConnectSafelyClient,
    query: PeopleSearchQuery,
}

impl PeopleSearchSource {
    pub fn new(client: ConnectSafelyClient, query: PeopleSearchQuery) -> Self {
        Self { client, query }
    }

    fn request_body(&self, cursor: usize, page_size: usize) -> Value {
        let mut body = json!({
            "keywords": self.query.keywords,
            "start": cursor,
            "count": page_size,
            "limit": page_size.min(100),
        });
        if let Some(location) = &self.query.location {
            body["location"] = json!(location);
        }
        if let Some(title) = &self.query.title {
            body["title"] = json!(title);
        }
        if !self.query.filters.is_empty() {
            body["filters"] = json!(self.query.filters);
        }
        body
    }
}

#[async_trait]
impl RecordSource for PeopleSearchSource {
    async fn fetch_page(&self, cursor: usize, page_size: usize) -> Result<RecordBatch> {
        let body = self.request_body(cursor, page_size);
        let payload = self
            .client
            .post_page("/linkedin/search/people", &body, cursor)
            .await?;

        // Some deployments wrap the response in a one-element array.
        let payload = match payload {
            Value::Array(items) => items.into_iter().next().unwrap_or_else(|| json!({})),
            other => other,
        };

        if payload.get("success") == Some(&Value::Bool(false)) {
            let message = payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("search reported failure")
                .to_string();
            return Err(ExportError::source_fetch(0, cursor, None, message));
        }

        let has_more = payload
            .get("hasMore")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let records = payload
            .get("people")
            .and_then(Value::as_array)
            .map(|people| people.iter().filter_map(normalize_person).collect())
            .unwrap_or_default();

        Ok(RecordBatch::new(records, has_more, cursor))
    }

    fn describe(&self) -> String {
        format!("people search \"{}\"", self.query.keywords)
    }
}

fn normalize_person(person: &Value) -> Option<Record> {
    let obj = person.as_object()?;
    let text = |field: &str| {
        obj.get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let flag = |field: &str| obj.get(field).and_then(Value::as_bool).unwrap_or(false);

    let first_name = text("firstName");
    let last_name = text("lastName");
    let headline = text("headline");
    let full_name = match obj.get("fullName").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{} {}", first_name, last_name).trim().to_string(),
    };

    let mut record = Record::default();
    record.insert("profileId", text("profileId"));
    record.insert("profileUrl", text("profileUrl"));
    record.insert("profileUrn", text("profileUrn"));
    record.insert("fullName", full_name);
    record.insert("firstName", first_name);
    record.insert("lastName", last_name);
    record.insert("company", extract_company(&headline));
    record.insert("headline", headline);
    record.insert("currentPosition", text("currentPosition"));
    record.insert("location", text("location"));
    record.insert("connectionDegree", text("connectionDegree"));
    record.insert("isPremium", flag("isPremium"));
    record.insert("isVerified", flag("isVerified"));
    record.insert("isOpenToWork", flag("isOpenToWork"));
    record.insert("profilePicture", text("profilePicture"));
    if let Some(badges) = obj.get("badges") {
        record.insert("badges", badges.clone());
    }
    Some(record)
}
