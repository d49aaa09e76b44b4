use std::collections::HashMap;

use axum::http::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

pub const ARCHIVE_SUFFIX: &str = ".tgz";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Invalid JSON request body")]
    InvalidBody,
    #[error("Missing 'chartUrl' query parameter")]
    MissingChartUrl,
    #[error("Invalid 'values' query parameter. Must be a JSON string.")]
    InvalidValues,
    #[error("Invalid or missing 'chartUrl'. Must be a .tgz URL.")]
    InvalidChartUrl,
    #[error("Only POST and GET methods are supported")]
    MethodNotAllowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Raw,
}

impl OutputFormat {
    fn from_query(query: &HashMap<String, String>) -> Self {
        match query.get("raw").map(String::as_str) {
            Some("true") => OutputFormat::Raw,
            _ => OutputFormat::Json,
        }
    }
}

/// One templating request, whichever way it was submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRequest {
    pub chart_url: Url,
    pub values: Map<String, Value>,
    pub format: OutputFormat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestPayload {
    #[serde(default)]
    chart_url: String,
    #[serde(default)]
    values: Option<Map<String, Value>>,
}

impl TemplateRequest {
    /// Build a request from a `/template` call.
    ///
    /// `POST` reads a JSON body, `GET` reads the `chartUrl` and `values` query
    /// parameters. `raw=true` in the query selects raw text output either way.
    pub fn parse(
        method: &Method,
        query: &HashMap<String, String>,
        body: &[u8],
    ) -> Result<Self, RequestError> {
        let payload = match *method {
            Method::POST => serde_json::from_slice::<RequestPayload>(body)
                .map_err(|_| RequestError::InvalidBody)?,
            Method::GET => {
                let chart_url = query
                    .get("chartUrl")
                    .filter(|url| !url.is_empty())
                    .ok_or(RequestError::MissingChartUrl)?;
                // `null` decodes to no overrides, like an absent parameter.
                let values = match query.get("values").filter(|v| !v.is_empty()) {
                    Some(values) => serde_json::from_str::<Option<Map<String, Value>>>(values)
                        .map_err(|_| RequestError::InvalidValues)?,
                    None => None,
                };
                RequestPayload {
                    chart_url: chart_url.clone(),
                    values,
                }
            }
            _ => return Err(RequestError::MethodNotAllowed),
        };

        Self::new(
            &payload.chart_url,
            payload.values.unwrap_or_default(),
            OutputFormat::from_query(query),
        )
    }

    /// Build the raw-output request behind the `/?c=<url>` shortcut.
    pub fn shortcut(chart_url: &str) -> Result<Self, RequestError> {
        Self::new(chart_url, Map::new(), OutputFormat::Raw)
    }

    fn new(
        chart_url: &str,
        values: Map<String, Value>,
        format: OutputFormat,
    ) -> Result<Self, RequestError> {
        if !chart_url.ends_with(ARCHIVE_SUFFIX) {
            return Err(RequestError::InvalidChartUrl);
        }
        let chart_url = Url::parse(chart_url).map_err(|_| RequestError::InvalidChartUrl)?;
        Ok(TemplateRequest {
            chart_url,
            values,
            format,
        })
    }
}
