//! World Bank v2 API integration.
//!
//! Request shape:
//! `GET {base}/v2/country/{country}/indicator/{indicator}?format=json&per_page=N`
//!
//! Success body: `[metadata, observations]`. Only the first page is read.

use reqwest::blocking::{Client, ClientBuilder};
use serde_json::Value;
use tracing::debug;

use crate::data::throttle::RateLimiter;
use crate::domain::{Observation, SourceConfig};
use crate::error::{AppError, FetchError};

pub const DEFAULT_BASE_URL: &str = "http://api.worldbank.org";
pub const DEFAULT_PER_PAGE: u32 = 10000;

const USER_AGENT: &str = concat!("wdi-harvest/", env!("CARGO_PKG_VERSION"));

/// Anything that can return the raw response body for one series.
///
/// The pipeline only depends on this trait, so tests can script responses
/// without a network.
pub trait SeriesSource: Sync {
    fn fetch_body(&self, country_code: &str, indicator_code: &str) -> Result<String, FetchError>;

    /// Human-readable location of the series, used in logs and `wdi plan`.
    fn describe(&self, country_code: &str, indicator_code: &str) -> String;
}

pub struct WorldBankClient {
    client: Client,
    base_url: String,
    per_page: u32,
    limiter: RateLimiter,
}

impl WorldBankClient {
    pub fn new(config: &SourceConfig) -> Result<Self, AppError> {
        Self::from_builder(Client::builder(), config)
    }

    fn from_builder(builder: ClientBuilder, config: &SourceConfig) -> Result<Self, AppError> {
        let client = builder
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            per_page: config.per_page,
            limiter: RateLimiter::new(config.min_interval),
        })
    }
}

impl SeriesSource for WorldBankClient {
    fn fetch_body(&self, country_code: &str, indicator_code: &str) -> Result<String, FetchError> {
        let url = series_url(&self.base_url, country_code, indicator_code);

        let per_page = self.per_page.to_string();

        self.limiter.acquire();
        debug!(%url, "requesting series");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("format", "json"),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        resp.text().map_err(|e| FetchError::Transport(e.to_string()))
    }

    fn describe(&self, country_code: &str, indicator_code: &str) -> String {
        format!(
            "{}?format=json&per_page={}",
            series_url(&self.base_url, country_code, indicator_code),
            self.per_page
        )
    }
}

/// Series endpoint for one (country, indicator) pair, without query string.
pub fn series_url(base_url: &str, country_code: &str, indicator_code: &str) -> String {
    format!(
        "{}/v2/country/{country_code}/indicator/{indicator_code}",
        base_url.trim_end_matches('/')
    )
}

/// Observations decoded from one response body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSeries {
    /// In source order; sorting happens in `table`.
    pub observations: Vec<Observation>,
    /// `date` values that were present but not an integer year.
    pub rejected_dates: Vec<String>,
    /// Page count from the metadata block, if it reported one.
    pub pages: Option<u64>,
}

impl ParsedSeries {
    pub fn is_truncated(&self) -> bool {
        self.pages.is_some_and(|p| p > 1)
    }
}

/// Decode a success body into observation records for `indicator_name`.
///
/// Anything other than a JSON array with at least two elements (and an array
/// in the second slot) is "no data" and yields an empty series. Only a body
/// that is not JSON at all is an error.
pub fn parse_series(body: &str, indicator_name: &str) -> Result<ParsedSeries, FetchError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    let mut parsed = ParsedSeries::default();

    let Value::Array(parts) = value else {
        return Ok(parsed);
    };
    if parts.len() < 2 {
        return Ok(parsed);
    }

    parsed.pages = parts[0].get("pages").and_then(as_page_count);

    let Some(entries) = parts[1].as_array() else {
        return Ok(parsed);
    };

    for entry in entries {
        let Some(fields) = entry.as_object() else {
            continue;
        };
        // Presence is structural: a `null` value still counts, a missing key does not.
        let (Some(date), Some(value)) = (fields.get("date"), fields.get("value")) else {
            continue;
        };

        match parse_year(date) {
            Some(year) => parsed.observations.push(Observation {
                year,
                indicator: indicator_name.to_string(),
                value: parse_value(value),
            }),
            None => parsed.rejected_dates.push(display_json(date)),
        }
    }

    Ok(parsed)
}

fn parse_year(date: &Value) -> Option<i64> {
    match date {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn parse_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

// `pages` is accepted as a number or a numeric string.
fn as_page_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn display_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    use super::*;

    /// Accept one connection, answer with `status` and `body`, and hand back
    /// the request line and headers that were received.
    fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut head = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end().to_string();
                if line.is_empty() {
                    break;
                }
                head.push(line);
            }

            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();
            head
        });

        (base_url, handle)
    }

    fn client(base_url: &str) -> WorldBankClient {
        let config = SourceConfig {
            base_url: base_url.to_string(),
            per_page: DEFAULT_PER_PAGE,
            timeout: Duration::from_secs(5),
            min_interval: Duration::ZERO,
        };
        // Loopback only; a proxy from the environment must not intercept it.
        WorldBankClient::from_builder(Client::builder().no_proxy(), &config).unwrap()
    }

    #[test]
    fn client_sends_series_path_and_query() {
        let (base_url, server) = serve_once("200 OK", r#"[{"pages":1}, [{"date":"2020","value":1.0}]]"#);

        let body = client(&base_url).fetch_body("TST", "NY.GDP.MKTP.CD").unwrap();
        let head = server.join().unwrap();

        assert_eq!(
            head[0],
            "GET /v2/country/TST/indicator/NY.GDP.MKTP.CD?format=json&per_page=10000 HTTP/1.1"
        );
        assert!(
            head.iter()
                .any(|h| h.to_ascii_lowercase().starts_with("user-agent: wdi-harvest/")),
            "headers: {head:?}"
        );
        assert_eq!(parse_series(&body, "GDP").unwrap().observations.len(), 1);
    }

    #[test]
    fn client_maps_error_status() {
        let (base_url, server) = serve_once("500 Internal Server Error", "oops");
        let err = client(&base_url).fetch_body("TST", "X").unwrap_err();
        server.join().unwrap();
        assert_eq!(err, FetchError::Status(500));
    }

    #[test]
    fn client_maps_refused_connection_to_transport() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = client(&format!("http://127.0.0.1:{port}"))
            .fetch_body("TST", "X")
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)), "{err:?}");
    }

    #[test]
    fn parses_observations_in_source_order() {
        let body = r#"[{"page":1,"pages":1,"per_page":10000,"total":3},
            [{"date":"2020","value":100.0},{"date":"2019","value":90.0},{"date":"2021","value":null}]]"#;
        let parsed = parse_series(body, "GDP").unwrap();
        let years: Vec<i64> = parsed.observations.iter().map(|o| o.year).collect();
        assert_eq!(years, vec![2020, 2019, 2021]);
        assert_eq!(parsed.observations[1].value, Some(90.0));
        assert_eq!(parsed.observations[2].value, None);
        assert!(parsed.observations.iter().all(|o| o.indicator == "GDP"));
        assert_eq!(parsed.pages, Some(1));
        assert!(!parsed.is_truncated());
    }

    #[test]
    fn short_or_empty_arrays_are_no_data() {
        for body in ["[]", "[{}]", "[{}, []]", "[{}, null]", r#"{"message":"x"}"#, "null"] {
            let parsed = parse_series(body, "GDP").unwrap();
            assert!(parsed.observations.is_empty(), "body {body}");
        }
    }

    #[test]
    fn api_error_message_is_no_data() {
        let body = r#"[{"message":[{"id":"120","key":"Invalid value","value":"The provided parameter value is not valid"}]}]"#;
        assert!(parse_series(body, "GDP").unwrap().observations.is_empty());
    }

    #[test]
    fn entries_missing_date_or_value_key_are_dropped() {
        let body = r#"[{}, [
            {"date":"2018"},
            {"value":5.0},
            {"date":"2019","value":null},
            {"date":"2020","value":1.5,"decimal":1},
            "garbage"
        ]]"#;
        let parsed = parse_series(body, "CPI").unwrap();
        let rows: Vec<(i64, Option<f64>)> =
            parsed.observations.iter().map(|o| (o.year, o.value)).collect();
        assert_eq!(rows, vec![(2019, None), (2020, Some(1.5))]);
    }

    #[test]
    fn non_integer_dates_are_rejected_not_fatal() {
        let body = r#"[{}, [{"date":"2020M01","value":1.0},{"date":"2020","value":2.0}]]"#;
        let parsed = parse_series(body, "CPI").unwrap();
        assert_eq!(parsed.observations.len(), 1);
        assert_eq!(parsed.rejected_dates, vec!["2020M01".to_string()]);
    }

    #[test]
    fn numeric_strings_and_numbers_both_parse() {
        let body = r#"[{}, [{"date":2001,"value":"3.25"},{"date":"2002","value":"n/a"},{"date":"2003","value":7}]]"#;
        let parsed = parse_series(body, "X").unwrap();
        let rows: Vec<(i64, Option<f64>)> =
            parsed.observations.iter().map(|o| (o.year, o.value)).collect();
        assert_eq!(rows, vec![(2001, Some(3.25)), (2002, None), (2003, Some(7.0))]);
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parse_series("<html>Service Unavailable</html>", "GDP").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn truncation_is_reported_from_metadata() {
        let body = r#"[{"page":1,"pages":"3"}, [{"date":"2020","value":1.0}]]"#;
        let parsed = parse_series(body, "GDP").unwrap();
        assert_eq!(parsed.pages, Some(3));
        assert!(parsed.is_truncated());
    }

    #[test]
    fn series_url_strips_trailing_slash() {
        assert_eq!(
            series_url("http://api.worldbank.org/", "TST", "NY.GDP.MKTP.CD"),
            "http://api.worldbank.org/v2/country/TST/indicator/NY.GDP.MKTP.CD"
        );
    }
}
