use chrono::{DateTime, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::priority;

pub type ReportId = String;
pub type ClientId = String;

/// Tag that gates real-time notifications and urgent map markers.
pub const URGENT_TAG: &str = "urgent";

lazy_static! {
    static ref TAG_SEPARATOR: Regex = Regex::new(r"\s*,\s*").expect("Invalid tag separator regex");
}

/// WGS-84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Derived urgency tier. Never taken from input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Normal,
    High,
}

/// Marker styling used by map overviews
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStyle {
    Default,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterReport {
    /// Some producers send numeric ids; they are kept as their decimal text.
    #[serde(deserialize_with = "string_or_number")]
    pub id: ReportId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Free-form tags, either a list or the comma-separated text of a report
    /// form. `null` reads as no tags.
    #[serde(default, deserialize_with = "tag_list_or_text")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location_name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_by: ClientId,
    /// RFC 3339, or a naive timestamp read as UTC. Anything else becomes "now".
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    /// Recomputed by the classifier; any incoming value is dropped.
    #[serde(default, skip_deserializing)]
    pub priority: Priority,
}

impl DisasterReport {
    pub fn location(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    /// True when any tag equals "urgent", ignoring case.
    pub fn has_urgent_tag(&self) -> bool {
        self.tags.iter().any(|tag| tag.eq_ignore_ascii_case(URGENT_TAG))
    }

    pub fn marker_style(&self) -> MarkerStyle {
        if self.has_urgent_tag() {
            MarkerStyle::Urgent
        } else {
            MarkerStyle::Default
        }
    }

    /// Returns the report with `priority` recomputed from its text and tags.
    pub fn classified(mut self) -> Self {
        self.priority = priority::classify(&self);
        self
    }
}

/// Parse a comma-separated tag string as typed into a report form.
/// Empty entries are dropped and exact duplicates keep their first occurrence.
pub fn parse_tags(input: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in TAG_SEPARATOR.split(input.trim()) {
        if tag.is_empty() || tags.iter().any(|t| t == tag) {
            continue;
        }
        tags.push(tag.to_string());
    }
    tags
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<ReportId, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("report id must be a string or number, got {}", other))),
    }
}

fn tag_list_or_text<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Text(String),
    }

    Ok(match Option::<Tags>::deserialize(deserializer)? {
        Some(Tags::List(tags)) => tags,
        Some(Tags::Text(text)) => parse_tags(&text),
        None => Vec::new(),
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(parse_timestamp).unwrap_or_else(Utc::now))
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
pub(crate) fn make_report(id: &str, lat: f64, lng: f64) -> DisasterReport {
    DisasterReport {
        id: id.to_string(),
        title: format!("Report {}", id),
        description: String::new(),
        tags: Vec::new(),
        location_name: "Somewhere".to_string(),
        lat,
        lng,
        created_by: "userA".to_string(),
        created_at: Utc::now(),
        priority: Priority::Normal,
    }
}
