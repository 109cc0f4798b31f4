//! EIA Open Data (v2) integration for hourly grid telemetry.
//!
//! Two routes are used:
//! - `fuel-type-data`: generation by fuel type (`type-name` is the category)
//! - `region-data`: demand (`D`), forecast (`DF`), net generation (`NG`) and
//!   total interchange (`TI`), distinguished by `type`
//!
//! Fetch failures never escape as errors: they come back as
//! `FetchOutcome::Absent` with a diagnostic, and the cache decides what to do.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::domain::{Frequency, SeriesKind, SeriesTable, TimeSeriesPoint};
use crate::error::{EngineError, EngineResult};

/// Upper bound on pages followed for a single query.
const MAX_PAGES: usize = 20;

/// One upstream request: a series for a BA over a closed window.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuery {
    pub kind: SeriesKind,
    pub ba: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Upstream error, empty payload, transport failure or timeout.
    Unavailable,
    /// The payload did not have the expected shape.
    Malformed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchDiagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl FetchDiagnostic {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Unavailable,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Malformed,
            message: message.into(),
        }
    }
}

/// Result of a fetch: a table, or nothing plus the reason why.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Data(SeriesTable),
    Absent(FetchDiagnostic),
}

/// Anything that can answer a `SeriesQuery`.
pub trait SeriesSource: Send + Sync {
    fn fetch(&self, query: &SeriesQuery) -> FetchOutcome;
}

pub struct EiaClient {
    client: Client,
    base_url: String,
    api_key: String,
    page_length: usize,
}

impl EiaClient {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            page_length: config.page_length.max(1),
        })
    }

    fn url(&self, kind: SeriesKind) -> String {
        format!("{}/{}/data/", self.base_url, kind.endpoint())
    }

    fn fetch_page(&self, query: &SeriesQuery, offset: usize) -> Result<Page, FetchDiagnostic> {
        let mut params = query_params(query, offset, self.page_length);
        params.push(("api_key".to_string(), self.api_key.clone()));

        let resp = self
            .client
            .get(self.url(query.kind))
            .query(&params)
            .send()
            .map_err(|e| FetchDiagnostic::unavailable(format!("EIA request failed: {}", e.without_url())))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| FetchDiagnostic::unavailable(format!("failed to read EIA response: {}", e.without_url())))?;

        if !status.is_success() {
            // Error bodies usually carry a readable `error` field; prefer it.
            let detail = serde_json::from_str::<Envelope>(&body)
                .ok()
                .and_then(|env| env.error)
                .map(|e| error_text(&e))
                .unwrap_or_else(|| status.to_string());
            return Err(FetchDiagnostic::unavailable(format!(
                "EIA request failed with status {status}: {detail}"
            )));
        }

        parse_page(query.kind, &body)
    }
}

impl SeriesSource for EiaClient {
    fn fetch(&self, query: &SeriesQuery) -> FetchOutcome {
        info!(
            series = %query.kind,
            ba = %query.ba,
            start = %query.start,
            end = %query.end,
            "fetching series"
        );
        collect_pages(query, self.page_length, |offset| self.fetch_page(query, offset))
    }
}

/// Follow `offset` pagination until the upstream runs out of rows.
///
/// Stops when `total` is reached (or, without `total`, on a short page), on
/// an empty page, or after `MAX_PAGES`. Any page failure aborts the fetch.
pub fn collect_pages(
    query: &SeriesQuery,
    page_length: usize,
    mut fetch_page: impl FnMut(usize) -> Result<Page, FetchDiagnostic>,
) -> FetchOutcome {
    let mut points = Vec::new();
    let mut offset = 0;
    let mut more = false;
    for page_no in 0..MAX_PAGES {
        let page = match fetch_page(offset) {
            Ok(page) => page,
            Err(diag) => {
                warn!(series = %query.kind, ba = %query.ba, "fetch failed: {}", diag.message);
                return FetchOutcome::Absent(diag);
            }
        };
        let received = page.rows_received;
        points.extend(page.points);
        offset += received;

        more = received > 0
            && match page.total {
                Some(total) => offset < total,
                None => received >= page_length,
            };
        debug!(page = page_no, received, offset, more, "page received");
        if !more {
            break;
        }
    }
    if more {
        warn!(
            series = %query.kind,
            ba = %query.ba,
            rows = offset,
            "stopped after {MAX_PAGES} pages; series is truncated"
        );
    }

    if points.is_empty() {
        let diag = FetchDiagnostic::unavailable(format!("EIA returned no {} rows for {}", query.kind, query.ba));
        warn!(series = %query.kind, ba = %query.ba, "{}", diag.message);
        return FetchOutcome::Absent(diag);
    }

    FetchOutcome::Data(SeriesTable::new(query.kind, query.ba.clone(), points))
}

/// Query parameters for one page, without the API key.
///
/// Both series select by respondent only; the demand route returns every
/// series type (D, DF, NG, TI) without a type facet.
pub fn query_params(query: &SeriesQuery, offset: usize, length: usize) -> Vec<(String, String)> {
    vec![
        ("frequency".to_string(), query.frequency.as_str().to_string()),
        ("data[0]".to_string(), "value".to_string()),
        ("facets[respondent][]".to_string(), query.ba.clone()),
        ("start".to_string(), format_period(query.start)),
        ("end".to_string(), format_period(query.end)),
        ("sort[0][column]".to_string(), "period".to_string()),
        ("sort[0][direction]".to_string(), "desc".to_string()),
        ("offset".to_string(), offset.to_string()),
        ("length".to_string(), length.to_string()),
    ]
}

/// Format an instant the way the upstream expects `start`/`end`.
pub fn format_period(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H").to_string()
}

/// Parse an upstream `period` value into a UTC instant.
///
/// Accepts `YYYY-MM-DDTHH`, `YYYY-MM-DDTHH:MM`, either with an optional `Z`
/// or `±HH[:MM]` suffix, and plain `YYYY-MM-DD`.
pub fn parse_period(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.len() == 10 {
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    if raw.len() < 13 || !raw.is_char_boundary(13) {
        return None;
    }

    let (stamp, suffix) = raw.split_at(13);
    let (minutes, suffix) = match suffix.strip_prefix(':') {
        Some(rest) if rest.len() >= 2 && rest.is_char_boundary(2) => (rest[..2].parse::<u32>().ok()?, &rest[2..]),
        Some(_) => return None,
        None => (0, suffix),
    };

    let naive = NaiveDateTime::parse_from_str(&format!("{stamp}:{minutes:02}"), "%Y-%m-%dT%H:%M").ok()?;
    let offset = parse_offset(suffix)?;
    let local = offset.from_local_datetime(&naive).single()?;
    Some(local.with_timezone(&Utc))
}

fn parse_offset(suffix: &str) -> Option<FixedOffset> {
    if suffix.is_empty() || suffix == "Z" {
        return FixedOffset::east_opt(0);
    }
    let sign = match suffix.as_bytes()[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let digits: String = suffix[1..].chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// One parsed page of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub points: Vec<TimeSeriesPoint>,
    /// Rows in the payload, including ones skipped for missing values.
    pub rows_received: usize,
    pub total: Option<usize>,
}

/// Parse a response body into points.
///
/// An `error` field means the upstream refused the query; a missing
/// `response.data` means the payload is not what we expect.
pub fn parse_page(kind: SeriesKind, body: &str) -> Result<Page, FetchDiagnostic> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| FetchDiagnostic::malformed(format!("failed to parse EIA response: {e}")))?;

    if let Some(err) = envelope.error {
        return Err(FetchDiagnostic::unavailable(format!("EIA reported an error: {}", error_text(&err))));
    }

    let response = envelope
        .response
        .ok_or_else(|| FetchDiagnostic::malformed("EIA response lacks a 'response' field"))?;
    let rows = response
        .data
        .ok_or_else(|| FetchDiagnostic::malformed("EIA response lacks a 'data' field"))?;

    let rows_received = rows.len();
    let mut points = Vec::with_capacity(rows_received);
    for row in rows {
        let Some(value) = row.value.as_ref().and_then(parse_value) else {
            continue;
        };
        let category = match kind {
            SeriesKind::Mix => row.type_name.as_deref().map(|s| s.trim().to_lowercase()),
            SeriesKind::Demand => row.type_code.as_deref().map(|s| s.trim().to_uppercase()),
        };
        let Some(category) = category.filter(|c| !c.is_empty()) else {
            return Err(FetchDiagnostic::malformed(format!(
                "{kind} row for period '{}' has no category",
                row.period
            )));
        };
        let period = parse_period(&row.period)
            .ok_or_else(|| FetchDiagnostic::malformed(format!("invalid EIA period '{}'", row.period)))?;
        points.push(TimeSeriesPoint::new(period, category, value));
    }

    Ok(Page {
        points,
        rows_received,
        total: response.total.as_ref().and_then(parse_count),
    })
}

#[derive(Debug, Deserialize)]
struct Envelope {
    response: Option<ResponseBody>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    total: Option<Value>,
    data: Option<Vec<Row>>,
}

#[derive(Debug, Deserialize)]
struct Row {
    period: String,
    #[serde(rename = "type-name")]
    type_name: Option<String>,
    #[serde(rename = "type")]
    type_code: Option<String>,
    value: Option<Value>,
}

fn parse_value(raw: &Value) -> Option<f64> {
    let v = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn parse_count(raw: &Value) -> Option<usize> {
    match raw {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn error_text(err: &Value) -> String {
    match err {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIX_BODY: &str = r#"{
        "response": {
            "total": "3",
            "data": [
                {"period": "2024-03-01T05", "respondent": "CISO", "fueltype": "SUN", "type-name": "Solar", "value": "120", "value-units": "megawatthours"},
                {"period": "2024-03-01T05", "respondent": "CISO", "fueltype": "WAT", "type-name": "Hydro", "value": 80, "value-units": "megawatthours"},
                {"period": "2024-03-01T05", "respondent": "CISO", "fueltype": "COL", "type-name": "Coal", "value": null, "value-units": "megawatthours"}
            ]
        }
    }"#;

    #[test]
    fn mix_rows_use_lowercased_type_name() {
        let page = parse_page(SeriesKind::Mix, MIX_BODY).unwrap();
        assert_eq!(page.rows_received, 3);
        assert_eq!(page.total, Some(3));
        let categories: Vec<&str> = page.points.iter().map(|p| p.category.as_str()).collect();
        assert_eq!(categories, vec!["solar", "hydro"]);
        assert_eq!(page.points[0].value, 120.0);
        assert_eq!(page.points[1].value, 80.0);
    }

    #[test]
    fn demand_rows_use_type_code() {
        let body = r#"{"response": {"total": 2, "data": [
            {"period": "2024-03-01T05", "respondent": "ERCO", "type": "D", "type-name": "Demand", "value": "41000"},
            {"period": "2024-03-01T05", "respondent": "ERCO", "type": "DF", "type-name": "Day-ahead demand forecast", "value": "40500"}
        ]}}"#;
        let page = parse_page(SeriesKind::Demand, body).unwrap();
        let categories: Vec<&str> = page.points.iter().map(|p| p.category.as_str()).collect();
        assert_eq!(categories, vec!["D", "DF"]);
    }

    #[test]
    fn error_field_is_unavailable_and_missing_data_is_malformed() {
        let err = parse_page(SeriesKind::Mix, r#"{"error": "invalid api_key", "code": 403}"#).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Unavailable);
        assert!(err.message.contains("invalid api_key"));

        let err = parse_page(SeriesKind::Mix, r#"{"response": {"total": 0}}"#).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Malformed);

        let err = parse_page(SeriesKind::Mix, "<html>").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Malformed);
    }

    #[test]
    fn periods_parse_in_all_supported_shapes() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap();
        assert_eq!(parse_period("2024-03-01T05"), Some(utc));
        assert_eq!(parse_period("2024-03-01T05Z"), Some(utc));
        assert_eq!(parse_period("2024-03-01T05:00"), Some(utc));
        assert_eq!(
            parse_period("2024-03-01T05-08"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap())
        );
        assert_eq!(
            parse_period("2024-03-01T05:30+05:30"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_period("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_period("2024-03-01T5"), None);
        assert_eq!(parse_period("yesterday"), None);
    }

    #[test]
    fn demand_query_has_no_type_facet() {
        let query = SeriesQuery {
            kind: SeriesKind::Demand,
            ba: "ERCO".to_string(),
            start: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 7, 0, 0, 0).unwrap(),
            frequency: Frequency::Hourly,
        };
        let params = query_params(&query, 0, 5000);
        assert!(params.iter().all(|(k, _)| !k.starts_with("facets[type]")));
        assert!(params.contains(&("facets[respondent][]".to_string(), "ERCO".to_string())));
        assert!(params.contains(&("start".to_string(), "2024-03-01T00".to_string())));
        assert!(params.contains(&("end".to_string(), "2024-03-07T00".to_string())));
        assert!(params.contains(&("frequency".to_string(), "hourly".to_string())));
    }

    fn demand_query() -> SeriesQuery {
        SeriesQuery {
            kind: SeriesKind::Demand,
            ba: "ERCO".to_string(),
            start: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 7, 0, 0, 0).unwrap(),
            frequency: Frequency::Hourly,
        }
    }

    /// A page of `rows` demand rows starting at hour `first`.
    fn page(first: u32, rows: usize, total: Option<usize>) -> Page {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        Page {
            points: (0..rows)
                .map(|i| TimeSeriesPoint::new(base + chrono::TimeDelta::hours((first as usize + i) as i64), "D", 100.0))
                .collect(),
            rows_received: rows,
            total,
        }
    }

    #[test]
    fn pages_are_followed_until_total_is_reached() {
        let mut offsets = Vec::new();
        let outcome = collect_pages(&demand_query(), 2, |offset| {
            offsets.push(offset);
            Ok(page(offset as u32, 2.min(5 - offset), Some(5)))
        });
        assert_eq!(offsets, vec![0, 2, 4]);
        let FetchOutcome::Data(table) = outcome else {
            panic!("expected data");
        };
        assert_eq!(table.len(), 5);
        assert_eq!(table.ba, "ERCO");
    }

    #[test]
    fn without_total_a_short_page_ends_the_fetch() {
        let mut calls = 0;
        let outcome = collect_pages(&demand_query(), 3, |offset| {
            calls += 1;
            Ok(if offset == 0 { page(0, 3, None) } else { page(3, 1, None) })
        });
        assert_eq!(calls, 2);
        assert!(matches!(outcome, FetchOutcome::Data(ref t) if t.len() == 4));
    }

    #[test]
    fn empty_page_stops_even_when_total_promises_more() {
        let mut calls = 0;
        let outcome = collect_pages(&demand_query(), 2, |offset| {
            calls += 1;
            Ok(if offset == 0 { page(0, 2, Some(10)) } else { page(2, 0, Some(10)) })
        });
        assert_eq!(calls, 2);
        assert!(matches!(outcome, FetchOutcome::Data(ref t) if t.len() == 2));
    }

    #[test]
    fn no_rows_at_all_is_unavailable() {
        let outcome = collect_pages(&demand_query(), 5000, |_| Ok(page(0, 0, Some(0))));
        let FetchOutcome::Absent(diag) = outcome else {
            panic!("expected absent");
        };
        assert_eq!(diag.kind, DiagnosticKind::Unavailable);
        assert!(diag.message.contains("ERCO"));
    }

    #[test]
    fn page_failure_aborts_the_fetch() {
        let outcome = collect_pages(&demand_query(), 2, |offset| {
            if offset == 0 {
                Ok(page(0, 2, Some(4)))
            } else {
                Err(FetchDiagnostic::malformed("bad second page"))
            }
        });
        assert_eq!(outcome, FetchOutcome::Absent(FetchDiagnostic::malformed("bad second page")));
    }

    #[test]
    fn page_cap_bounds_an_endless_upstream() {
        let mut calls = 0;
        let outcome = collect_pages(&demand_query(), 1, |offset| {
            calls += 1;
            Ok(page(offset as u32, 1, None))
        });
        assert_eq!(calls, MAX_PAGES);
        assert!(matches!(outcome, FetchOutcome::Data(ref t) if t.len() == MAX_PAGES));
    }

    #[test]
    fn transport_errors_do_not_leak_the_api_key() {
        let config = EngineConfig {
            api_key: "SECRETKEY123".to_string(),
            base_url: "http://127.0.0.1:1".to_string(),
            request_timeout: std::time::Duration::from_secs(2),
            ..EngineConfig::default()
        };
        let client = EiaClient::new(&config).unwrap();
        let FetchOutcome::Absent(diag) = client.fetch(&demand_query()) else {
            panic!("closed port must not yield data");
        };
        assert_eq!(diag.kind, DiagnosticKind::Unavailable);
        assert!(diag.message.starts_with("EIA request failed"));
        assert!(!diag.message.contains("SECRETKEY123"), "{}", diag.message);
    }
}
