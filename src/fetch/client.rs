use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::FetchConfig;
use crate::error::{ProcessingError, Result};
use crate::fetch::{render_url, GridSource, RetryPolicy};
use crate::models::{MonthGrid, MonthPeriod};
use crate::readers::GridReader;
use crate::utils::coordinates::GeoBoundingBox;

/// Downloads monthly NetCDF grids over HTTP
pub struct HttpGridSource {
    client: Client,
    url_template: String,
    retry: RetryPolicy,
    variable: String,
    window: Option<GeoBoundingBox>,
}

impl HttpGridSource {
    pub fn new(config: &FetchConfig, variable: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProcessingError::Http {
                url: config.url_template.clone(),
                source: e,
            })?;

        Ok(Self::from_client(client, config, variable))
    }

    pub fn from_client(client: Client, config: &FetchConfig, variable: &str) -> Self {
        Self {
            client,
            url_template: config.url_template.clone(),
            retry: RetryPolicy::from_config(config),
            variable: variable.to_string(),
            window: None,
        }
    }

    /// Only decode grid cells inside `window`
    pub fn with_window(mut self, window: GeoBoundingBox) -> Self {
        self.window = Some(window);
        self
    }

    pub fn url_for(&self, period: &MonthPeriod) -> String {
        render_url(&self.url_template, period)
    }

    /// GET with retries on transient failures
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.retry.run(url, || self.fetch_once(url)).await
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>> {
        let http_error = |e| ProcessingError::Http {
            url: url.to_string(),
            source: e,
        };

        let response = self.client.get(url).send().await.map_err(http_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProcessingError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await.map_err(http_error)?;
        debug!(url, bytes = bytes.len(), "Downloaded grid");

        Ok(bytes.to_vec())
    }
}

impl GridSource for HttpGridSource {
    async fn fetch_month(&self, period: MonthPeriod) -> Result<MonthGrid> {
        let url = self.url_for(&period);
        info!(%period, url, "Fetching grid");

        let bytes = self.fetch_bytes(&url).await?;

        let variable = self.variable.clone();
        let window = self.window;
        let grid = tokio::task::spawn_blocking(move || {
            let reader = GridReader::new(&variable);
            let reader = match window {
                Some(window) => reader.with_window(window),
                None => reader,
            };
            reader.read_bytes(&bytes, period)
        })
        .await??;

        Ok(grid)
    }
}
