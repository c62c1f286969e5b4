//! Data models for the review statistics engine.
//!
//! This module contains the review record that every calculator consumes,
//! the requested/computed stat pair, and the response envelopes handed back
//! to callers.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Sentiment label attached to a review by the NLP stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl Sentiment {
    /// All four categories, in output order.
    pub const ALL: [Sentiment; 4] = [
        Sentiment::Positive,
        Sentiment::Negative,
        Sentiment::Neutral,
        Sentiment::Mixed,
    ];

    /// Parse a stored label. Anything other than the four known values is `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "POSITIVE" => Some(Sentiment::Positive),
            "NEGATIVE" => Some(Sentiment::Negative),
            "NEUTRAL" => Some(Sentiment::Neutral),
            "MIXED" => Some(Sentiment::Mixed),
            _ => None,
        }
    }

    /// The stored label for this sentiment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "POSITIVE",
            Sentiment::Negative => "NEGATIVE",
            Sentiment::Neutral => "NEUTRAL",
            Sentiment::Mixed => "MIXED",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse an ISO-8601 date or date-time into a calendar date.
///
/// Accepts `2018-05-21`, `2018-05-21T10:15:00`, `2018-05-21T10:15:00.000Z`
/// and offset forms. The time of day is discarded; the date is the one
/// written in the string, not converted to any other zone.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }

    None
}

fn deserialize_calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid ISO-8601 date: {}", raw)))
}

fn serialize_calendar_date<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
}

// Missing, empty, unknown and non-string labels all become `None`.
fn deserialize_sentiment<'de, D>(deserializer: D) -> Result<Option<Sentiment>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(Sentiment::parse))
}

// Anything but an array reads as no keywords; non-string elements are dropped.
fn deserialize_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    let keywords = match raw {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(keyword) => Some(keyword),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(keywords)
}

/// One customer review, as stored by the scraping and NLP stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    /// Composite key: app identifier and store name.
    pub app_id_store: String,
    /// Posting date of the review.
    #[serde(
        deserialize_with = "deserialize_calendar_date",
        serialize_with = "serialize_calendar_date"
    )]
    pub date: NaiveDate,
    /// App version the review pertains to.
    pub version: String,
    /// Unique review identifier.
    pub review_hash: String,
    /// Sentiment label, `None` when missing or unrecognized.
    #[serde(default, deserialize_with = "deserialize_sentiment")]
    pub sentiment: Option<Sentiment>,
    /// Extracted topics, in extraction order.
    #[serde(default, deserialize_with = "deserialize_keywords")]
    pub keywords: Vec<String>,
    /// Any further attributes the store carries (review text, rating, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
impl ReviewRecord {
    /// Creates a record with no keywords and no extra attributes.
    pub fn new(
        app_id_store: impl Into<String>,
        date: NaiveDate,
        version: impl Into<String>,
        review_hash: impl Into<String>,
        sentiment: Option<Sentiment>,
    ) -> Self {
        Self {
            app_id_store: app_id_store.into(),
            date,
            version: version.into(),
            review_hash: review_hash.into(),
            sentiment,
            keywords: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Builder-style keyword assignment.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// Inclusive calendar-date window of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// True when `start <= end`.
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    /// Whether a date falls inside the window (both ends inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, `0` for an inverted window.
    pub fn len_days(&self) -> usize {
        if !self.is_ordered() {
            return 0;
        }
        (self.end - self.start).num_days() as usize + 1
    }

    /// Every day of the window in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let count = self.len_days();
        (0..count).filter_map(move |offset| self.start.checked_add_days(Days::new(offset as u64)))
    }
}

/// A stat the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedStat {
    pub name: String,
    /// Reserved for future calculators; no current calculator reads it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
}

impl RequestedStat {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }
}

/// Percentage of reviews in each sentiment category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SentimentShares {
    #[serde(rename = "POSITIVE")]
    pub positive: f64,
    #[serde(rename = "NEGATIVE")]
    pub negative: f64,
    #[serde(rename = "NEUTRAL")]
    pub neutral: f64,
    #[serde(rename = "MIXED")]
    pub mixed: f64,
}

impl SentimentShares {
    pub fn get(&self, sentiment: Sentiment) -> f64 {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
            Sentiment::Mixed => self.mixed,
        }
    }

    pub fn sum(&self) -> f64 {
        self.positive + self.negative + self.neutral + self.mixed
    }
}

/// Day-by-day trend: three parallel series of equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSeries {
    pub labels: Vec<String>,
    /// Polarity percentage per day; `None` for days without reviews.
    pub data: Vec<Option<f64>>,
    pub totals: Vec<usize>,
}

/// One ranked keyword.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordScore {
    pub keyword: String,
    pub percentage: f64,
}

/// Top keywords for each polarity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeywordGroups {
    pub positive: Vec<KeywordScore>,
    pub negative: Vec<KeywordScore>,
}

/// The result shapes a calculator can produce.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValues {
    /// reviewHash -> JSON of the review's scalar fields.
    Reviews(BTreeMap<String, String>),
    Count { total: usize },
    Distribution(SentimentShares),
    Trend(TrendSeries),
    Keywords(KeywordGroups),
    /// The calculator failed; only this stat is affected.
    Error { error: String },
}

impl StatValues {
    pub fn is_error(&self) -> bool {
        matches!(self, StatValues::Error { .. })
    }
}

/// A named result produced by one calculator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputedStat {
    pub name: String,
    pub values: StatValues,
}

impl ComputedStat {
    pub fn new(name: impl Into<String>, values: StatValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// A statistics query: which app, which version, which window, which stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRequest {
    pub app_id_store: String,
    pub version: String,
    #[serde(
        deserialize_with = "deserialize_calendar_date",
        serialize_with = "serialize_calendar_date"
    )]
    pub start_date: NaiveDate,
    #[serde(
        deserialize_with = "deserialize_calendar_date",
        serialize_with = "serialize_calendar_date"
    )]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub stats: Vec<RequestedStat>,
}

impl StatsRequest {
    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.start_date, self.end_date)
    }
}

/// Answer to a [`StatsRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatsResponse {
    #[serde(rename_all = "camelCase")]
    Success {
        app_id_store: String,
        version: String,
        stats: Vec<ComputedStat>,
    },
    Error { message: String },
}

impl StatsResponse {
    pub fn error(message: impl Into<String>) -> Self {
        StatsResponse::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StatsResponse::Success { .. })
    }

    /// Nested `name -> values` document of the computed stats.
    ///
    /// Returns `None` for an error response.
    pub fn to_document(&self) -> Option<serde_json::Value> {
        match self {
            StatsResponse::Success { stats, .. } => {
                let mut doc = serde_json::Map::new();
                for stat in stats {
                    let values = serde_json::to_value(&stat.values).unwrap_or_default();
                    doc.insert(stat.name.clone(), values);
                }
                Some(serde_json::Value::Object(doc))
            }
            StatsResponse::Error { .. } => None,
        }
    }
}

/// SUCCESS/ERROR envelope of the settings and catalog operations.
///
/// The success payload's fields sit beside `status`:
/// `{"status": "SUCCESS", "ignoreList": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reply<T> {
    Success(T),
    Error { message: String },
}

impl<T> Reply<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_calendar_date_forms() {
        assert_eq!(parse_calendar_date("2018-05-21"), Some(date(2018, 5, 21)));
        assert_eq!(
            parse_calendar_date("2018-05-21T00:00:00.000Z"),
            Some(date(2018, 5, 21))
        );
        assert_eq!(
            parse_calendar_date("2018-05-21T23:59:59+09:00"),
            Some(date(2018, 5, 21))
        );
        assert_eq!(
            parse_calendar_date("2018-05-21T08:30:00"),
            Some(date(2018, 5, 21))
        );
        assert_eq!(parse_calendar_date("21/05/2018"), None);
    }

    #[test]
    fn test_sentiment_parse() {
        assert_eq!(Sentiment::parse("POSITIVE"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::parse("mixed"), Some(Sentiment::Mixed));
        assert_eq!(Sentiment::parse(""), None);
        assert_eq!(Sentiment::parse("ANGRY"), None);
    }

    #[test]
    fn test_review_record_tolerates_malformed_fields() {
        let record: ReviewRecord = serde_json::from_value(json!({
            "appIdStore": "id*App Store",
            "date": "2018-05-21T00:00:00.000Z",
            "version": "1.0.0",
            "reviewHash": "abc",
            "sentiment": "SOMETHING_ELSE",
            "keywords": null,
            "rating": 4
        }))
        .unwrap();

        assert_eq!(record.date, date(2018, 5, 21));
        assert_eq!(record.sentiment, None);
        assert!(record.keywords.is_empty());
        assert_eq!(record.extra.get("rating"), Some(&json!(4)));

        let missing: ReviewRecord = serde_json::from_value(json!({
            "appIdStore": "id*App Store",
            "date": "2018-05-21",
            "version": "1.0.0",
            "reviewHash": "def"
        }))
        .unwrap();
        assert_eq!(missing.sentiment, None);
        assert!(missing.keywords.is_empty());
    }

    #[test]
    fn test_window_days() {
        let window = DateWindow::new(date(2001, 2, 27), date(2001, 3, 2));
        let days: Vec<_> = window.days().collect();
        assert_eq!(window.len_days(), 4);
        assert_eq!(
            days,
            vec![date(2001, 2, 27), date(2001, 2, 28), date(2001, 3, 1), date(2001, 3, 2)]
        );
        assert!(window.contains(date(2001, 3, 2)));
        assert!(!window.contains(date(2001, 3, 3)));

        let inverted = DateWindow::new(date(2001, 3, 2), date(2001, 2, 27));
        assert_eq!(inverted.len_days(), 0);
        assert_eq!(inverted.days().count(), 0);
    }

    #[test]
    fn test_stat_values_wire_shapes() {
        let count = serde_json::to_value(StatValues::Count { total: 3 }).unwrap();
        assert_eq!(count, json!({"total": 3}));

        let shares = serde_json::to_value(StatValues::Distribution(SentimentShares {
            positive: 50.0,
            negative: 50.0,
            neutral: 0.0,
            mixed: 0.0,
        }))
        .unwrap();
        assert_eq!(
            shares,
            json!({"POSITIVE": 50.0, "NEGATIVE": 50.0, "NEUTRAL": 0.0, "MIXED": 0.0})
        );

        let trend = serde_json::to_value(StatValues::Trend(TrendSeries {
            labels: vec!["May 21".to_string()],
            data: vec![None],
            totals: vec![0],
        }))
        .unwrap();
        assert_eq!(trend, json!({"labels": ["May 21"], "data": [null], "totals": [0]}));
    }

    #[test]
    fn test_response_envelopes() {
        let ok = StatsResponse::Success {
            app_id_store: "id*App Store".to_string(),
            version: "1.0.0".to_string(),
            stats: vec![ComputedStat::new("numReviews", StatValues::Count { total: 2 })],
        };
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["status"], "SUCCESS");
        assert_eq!(value["appIdStore"], "id*App Store");
        assert_eq!(value["stats"][0]["name"], "numReviews");
        assert_eq!(value["stats"][0]["values"]["total"], 2);
        assert_eq!(
            ok.to_document(),
            Some(json!({"numReviews": {"total": 2}}))
        );

        let err = StatsResponse::error("boom");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"status": "ERROR", "message": "boom"})
        );
        assert_eq!(err.to_document(), None);
    }

    #[test]
    fn test_stats_request_parses_date_times() {
        let request: StatsRequest = serde_json::from_value(json!({
            "appIdStore": "id*App Store",
            "version": "1.0.0",
            "startDate": "2001-01-01T00:00:00.000Z",
            "endDate": "2001-01-03",
            "stats": [{"name": "numReviews"}, {"name": "keywords", "params": ["x"]}]
        }))
        .unwrap();

        assert_eq!(request.window().len_days(), 3);
        assert_eq!(request.stats[1].params, vec!["x".to_string()]);
    }

    #[test]
    fn test_reply_flattens_payload_beside_status() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            ignore_list: Vec<String>,
        }

        let ok = Reply::Success(Payload {
            ignore_list: vec!["app".to_string()],
        });
        assert!(ok.is_success());
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"status": "SUCCESS", "ignoreList": ["app"]})
        );

        let err: Reply<Payload> = Reply::error("No keyword x present in list.");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"status": "ERROR", "message": "No keyword x present in list."})
        );
    }
}
