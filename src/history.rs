//! Past sessions fetched from the meeting service
//!
//! The cache is replaced wholesale on every refresh and left untouched when
//! a refresh fails. History is best-effort, so failures are only logged.

use crate::error::{ServiceError, SessionError};
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info, warn};

/// Number of summary characters shown in the history list
const PREVIEW_CHARS: usize = 100;

/// Naive formats the service is known to emit, all meaning UTC
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Snapshot of a completed session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct HistoryEntry {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub filename: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub transcript: String,
    pub summary: String,
    pub emails: Vec<String>,
}

impl HistoryEntry {
    /// Leading part of the summary for list display
    pub fn preview(&self) -> String {
        let mut chars = self.summary.chars();
        let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }

    /// Timestamp rendered in the system timezone
    pub fn local_timestamp(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }
}

/// Parse a service timestamp, treating values without a zone as UTC
pub(crate) fn parse_utc_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = raw.strip_suffix('Z').unwrap_or(raw);
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|dt| dt.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_utc_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// Locally held list of past sessions
#[derive(Debug, Default)]
pub(crate) struct HistoryCache {
    entries: Vec<HistoryEntry>,
    generation: u64,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Mark the start of a refresh, returning its generation
    pub fn begin_refresh(&mut self) -> u64 {
        self.generation += 1;
        debug!(generation = self.generation, "History refresh started");
        self.generation
    }

    /// Whether `generation` is the most recent refresh
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Apply a fetched list
    ///
    /// Responses from an older refresh than the latest one are ignored.
    /// On failure the previous entries are kept and the error is returned
    /// for logging only.
    pub fn apply(
        &mut self,
        generation: u64,
        result: Result<Vec<HistoryEntry>, ServiceError>,
    ) -> Result<(), SessionError> {
        if !self.is_current(generation) {
            debug!(
                generation,
                latest = self.generation,
                "Ignoring superseded history response"
            );
            return Ok(());
        }
        match result {
            Ok(entries) => {
                info!(count = entries.len(), "History refreshed");
                self.entries = entries;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to fetch history: {}", e);
                Err(SessionError::HistoryFetchFailed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, summary: &str) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            filename: "standup.txt".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            transcript: "t".to_string(),
            summary: summary.to_string(),
            emails: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        }
    }

    #[test]
    fn test_parse_timestamp_without_zone_is_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_utc_timestamp("2024-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_utc_timestamp("2024-01-02T03:04:05"), Some(expected));
        assert_eq!(parse_utc_timestamp("2024-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_utc_timestamp("2024-01-02 03:04:05Z"), Some(expected));
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 1, 4, 5).unwrap();
        assert_eq!(parse_utc_timestamp("2024-01-02T03:04:05+02:00"), Some(expected));
    }

    #[test]
    fn test_parse_timestamp_fractional_seconds() {
        let parsed = parse_utc_timestamp("2024-01-02T03:04:05.250").unwrap();
        assert_eq!(parsed.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_utc_timestamp("yesterday").is_none());
        assert!(parse_utc_timestamp("").is_none());
    }

    #[test]
    fn test_history_entry_deserialization() {
        let json = r#"[
            {
                "id": 3,
                "filename": "sync.docx",
                "transcript": "Dana: status",
                "summary": "Status sync",
                "emails": ["one", "two", "three"],
                "timestamp": "2024-03-04 10:00:00"
            },
            {
                "id": "abc",
                "filename": "plan.txt",
                "transcript": "",
                "summary": "",
                "emails": [],
                "timestamp": "2024-03-05T10:00:00Z"
            }
        ]"#;

        let entries: Vec<HistoryEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "3");
        assert_eq!(
            entries[0].timestamp,
            Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap()
        );
        assert_eq!(entries[0].emails, ["one", "two", "three"]);
        assert_eq!(entries[1].id, "abc");
        assert!(entries[1].emails.is_empty());
    }

    #[test]
    fn test_history_entry_bad_timestamp_fails() {
        let json = r#"{"id": 1, "filename": "f", "transcript": "", "summary": "",
                       "emails": [], "timestamp": "not a date"}"#;
        assert!(serde_json::from_str::<HistoryEntry>(json).is_err());
    }

    #[test]
    fn test_preview_truncates_long_summaries() {
        let long = "x".repeat(150);
        assert_eq!(entry("1", &long).preview(), format!("{}...", "x".repeat(100)));
        assert_eq!(entry("1", "short").preview(), "short");
    }

    #[test]
    fn test_refresh_replaces_entries() {
        let mut cache = HistoryCache::new();
        assert!(cache.entries().is_empty());

        let gen = cache.begin_refresh();
        cache.apply(gen, Ok(vec![entry("1", "a"), entry("2", "b")])).unwrap();
        assert_eq!(cache.entries().len(), 2);

        let gen = cache.begin_refresh();
        cache.apply(gen, Ok(vec![entry("3", "c")])).unwrap();
        assert_eq!(cache.entries().len(), 1);
        assert!(cache.get("1").is_none());
        assert_eq!(cache.get("3").unwrap().summary, "c");
    }

    #[test]
    fn test_failed_refresh_keeps_previous_entries() {
        let mut cache = HistoryCache::new();
        let gen = cache.begin_refresh();
        cache.apply(gen, Ok(vec![entry("1", "a")])).unwrap();

        let gen = cache.begin_refresh();
        let err = cache
            .apply(gen, Err(ServiceError::InvalidResponse("down".into())))
            .unwrap_err();
        assert!(matches!(err, SessionError::HistoryFetchFailed(_)));
        assert_eq!(cache.entries().len(), 1);
    }

    #[test]
    fn test_superseded_refresh_is_ignored() {
        let mut cache = HistoryCache::new();
        let old = cache.begin_refresh();
        let new = cache.begin_refresh();
        assert!(!cache.is_current(old));
        assert!(cache.is_current(new));
        cache.apply(new, Ok(vec![entry("new", "n")])).unwrap();
        cache.apply(old, Ok(vec![entry("old", "o")])).unwrap();
        assert_eq!(cache.entries().len(), 1);
        assert!(cache.get("new").is_some());
    }
}
