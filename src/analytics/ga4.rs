use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::analytics::{UserCountSource, page_path_pattern};
use crate::error::{AnalyticsError, Result};
use crate::fetch::auth::{ApiKey, Credentials, fetch_access_token};
use crate::fetch::{BasicClient, HttpClient, send_json};
use crate::window::DateWindow;

pub const DEFAULT_API_BASE_URL: &str = "https://analyticsdata.googleapis.com";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// How to reach and authenticate against the Data API.
#[derive(Debug, Clone)]
pub struct Ga4Settings {
    pub api_base_url: String,
    pub token_url: String,
    /// Used as-is when present; otherwise exchanged from `credentials_path`.
    pub access_token: Option<String>,
    pub credentials_path: Option<PathBuf>,
    /// Stripped from URLs before building the page-path pattern.
    pub site_prefix: Option<String>,
}

impl Default for Ga4Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            access_token: None,
            credentials_path: None,
            site_prefix: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReportRequest<'a> {
    date_ranges: [DateRange; 1],
    dimensions: [Named<'a>; 1],
    metrics: [Named<'a>; 1],
    dimension_filter: FilterExpression<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DateRange {
    start_date: String,
    end_date: String,
}

#[derive(Serialize)]
struct Named<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct FilterExpression<'a> {
    filter: Filter<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Filter<'a> {
    field_name: &'a str,
    string_filter: StringFilter<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StringFilter<'a> {
    match_type: &'a str,
    value: &'a str,
}

#[derive(Deserialize)]
struct RunReportResponse {
    #[serde(default)]
    rows: Vec<ReportRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRow {
    #[serde(default)]
    metric_values: Vec<MetricValue>,
}

#[derive(Deserialize)]
struct MetricValue {
    value: String,
}

/// Data API client. Build one per run and pass it by reference.
pub struct Ga4Client<C> {
    http: C,
    api_base_url: String,
    site_prefix: Option<String>,
}

impl Ga4Client<ApiKey<BasicClient>> {
    /// Resolves an access token and returns an authenticated client.
    pub async fn connect(settings: &Ga4Settings) -> anyhow::Result<Self> {
        let token = match (&settings.access_token, &settings.credentials_path) {
            (Some(token), _) => token.clone(),
            (None, Some(path)) => {
                let credentials = Credentials::load(path)?;
                fetch_access_token(&BasicClient::new()?, &settings.token_url, &credentials).await?
            }
            (None, None) => anyhow::bail!(
                "no credentials: pass --credentials, or set GA4_CREDENTIALS or GA4_ACCESS_TOKEN"
            ),
        };

        let http = ApiKey::bearer(BasicClient::new()?, &token)?;
        Ok(Self::with_http(http, settings))
    }
}

impl<C: HttpClient> Ga4Client<C> {
    pub fn with_http(http: C, settings: &Ga4Settings) -> Self {
        Self {
            http,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            site_prefix: settings.site_prefix.clone(),
        }
    }

    async fn run_report(
        &self,
        property_id: &str,
        window: &DateWindow,
        pattern: &str,
    ) -> anyhow::Result<u64> {
        let url = format!(
            "{}/v1beta/properties/{}:runReport",
            self.api_base_url, property_id
        );
        let request = RunReportRequest {
            date_ranges: [DateRange {
                start_date: window.start_str(),
                end_date: window.end_str(),
            }],
            dimensions: [Named { name: "pagePath" }],
            metrics: [Named { name: "totalUsers" }],
            dimension_filter: FilterExpression {
                filter: Filter {
                    field_name: "pagePath",
                    string_filter: StringFilter {
                        match_type: "PARTIAL_REGEXP",
                        value: pattern,
                    },
                },
            },
        };

        let response: RunReportResponse = send_json(&self.http, &url, &request).await?;

        // several page paths can match one pattern
        let mut total = 0u64;
        for row in &response.rows {
            let value = row
                .metric_values
                .first()
                .ok_or_else(|| anyhow::anyhow!("report row has no metric values"))?;
            let users: u64 = value
                .value
                .parse()
                .map_err(|e| anyhow::anyhow!("bad totalUsers value '{}': {}", value.value, e))?;
            total = total.saturating_add(users);
        }
        Ok(total)
    }
}

#[async_trait]
impl<C: HttpClient> UserCountSource for Ga4Client<C> {
    #[tracing::instrument(skip(self, custom_regex))]
    async fn get_user_count(
        &self,
        property_id: &str,
        url: &str,
        window: &DateWindow,
        custom_regex: Option<&str>,
    ) -> Result<u64> {
        let pattern = match custom_regex {
            Some(regex) => regex.to_string(),
            None => page_path_pattern(url, self.site_prefix.as_deref()),
        };
        debug!(pattern = %pattern, custom = custom_regex.is_some(), "Requesting report");

        self.run_report(property_id, window, &pattern)
            .await
            .map_err(|e| AnalyticsError::UpstreamFailure(format!("{e:#}")))
    }
}
