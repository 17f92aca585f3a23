use crate::core::{ConfigProvider, Record, RecordBatch, RecordSource};
use crate::utils::error::{QualityError, Result};
use async_trait::async_trait;
use reqwest::Client;

pub const NYC_311_ENDPOINT: &str = "https://data.cityofnewyork.us/resource/erm2-nwe9.json";

/// Loads service requests from a Socrata Open Data endpoint, page by page.
pub struct SocrataSource<C: ConfigProvider> {
    config: C,
    client: Client,
}

impl<C: ConfigProvider> SocrataSource<C> {
    pub fn new(config: C) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<serde_json::Value>> {
        let endpoint = self.config.api_endpoint();

        let mut request = self
            .client
            .get(endpoint)
            .query(&[("$limit", limit.to_string()), ("$offset", offset.to_string())])
            .timeout(self.config.request_timeout());

        let order = self.config.order_by();
        if !order.is_empty() {
            request = request.query(&[("$order", order)]);
        }

        let extra = self.config.query_parameters();
        if !extra.is_empty() {
            request = request.query(&extra);
        }

        if let Some(token) = self.config.app_token() {
            request = request.header("X-App-Token", token);
        }

        tracing::debug!("Requesting {} (offset {}, limit {})", endpoint, offset, limit);
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            return Err(QualityError::HttpStatusError {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }

        match response.json::<serde_json::Value>().await? {
            serde_json::Value::Array(items) => Ok(items),
            other => Err(QualityError::PayloadError {
                message: format!("expected a JSON array, got {}", json_kind(&other)),
            }),
        }
    }

    async fn fetch_page_with_retry(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<serde_json::Value>> {
        let max_attempts = self.config.retry_attempts();
        let mut attempt = 0;

        loop {
            match self.fetch_page(offset, limit).await {
                Ok(items) => return Ok(items),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    attempt += 1;
                    let delay = self.config.retry_delay() * attempt;
                    tracing::warn!(
                        "Request failed ({}), retry {}/{} in {:?}",
                        e,
                        attempt,
                        max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[async_trait]
impl<C: ConfigProvider> RecordSource for SocrataSource<C> {
    async fn fetch(&self) -> Result<RecordBatch> {
        let max_records = self.config.max_records();
        let page_size = self.config.page_size().max(1);
        let mut records = Vec::new();
        let mut skipped = 0;
        let mut offset = 0;

        while records.len() < max_records {
            let limit = page_size.min(max_records - records.len());
            let items = self.fetch_page_with_retry(offset, limit).await?;
            let received = items.len();

            for item in items {
                match item {
                    serde_json::Value::Object(obj) => records.push(Record::from_json_object(&obj)),
                    _ => skipped += 1,
                }
            }

            tracing::debug!("Page at offset {} returned {} rows", offset, received);
            if received < limit {
                break;
            }
            offset += received;
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} non-object rows in API response", skipped);
        }

        Ok(RecordBatch::new(records))
    }

    fn describe(&self) -> String {
        self.config.api_endpoint().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Field, FieldValue};
    use httpmock::prelude::*;
    use std::time::Duration;

    struct MockConfig {
        api_endpoint: String,
        output_path: String,
        max_records: usize,
        page_size: usize,
        app_token: Option<String>,
        retry_attempts: u32,
    }

    impl MockConfig {
        fn new(api_endpoint: String) -> Self {
            Self {
                api_endpoint,
                output_path: "test_output".to_string(),
                max_records: 1000,
                page_size: 1000,
                app_token: None,
                retry_attempts: 0,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn api_endpoint(&self) -> &str {
            &self.api_endpoint
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn max_records(&self) -> usize {
            self.max_records
        }

        fn page_size(&self) -> usize {
            self.page_size
        }

        fn app_token(&self) -> Option<&str> {
            self.app_token.as_deref()
        }

        fn retry_attempts(&self) -> u32 {
            self.retry_attempts
        }

        fn retry_delay(&self) -> Duration {
            Duration::from_millis(0)
        }
    }

    #[tokio::test]
    async fn test_fetch_single_page() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/resource/erm2-nwe9.json")
                .query_param("$limit", "1000")
                .query_param("$offset", "0")
                .query_param_exists("$order");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([
                    {"unique_key": "1", "created_date": "2024-03-18T09:00:00.000", "status": "Open"},
                    {"unique_key": "2", "created_date": "2024-03-17T09:00:00.000", "status": "Closed",
                     "closed_date": "2024-03-17T11:00:00.000"}
                ]));
        });

        let source = SocrataSource::new(MockConfig::new(server.url("/resource/erm2-nwe9.json")));
        let batch = source.fetch().await.unwrap();

        api_mock.assert();
        assert_eq!(batch.len(), 2);
        assert_eq!(
            batch.records()[0].get(Field::Status),
            &FieldValue::Text("Open".to_string())
        );
        assert!(matches!(
            batch.records()[1].get(Field::ClosedDate),
            FieldValue::Timestamp(_)
        ));
    }

    #[tokio::test]
    async fn test_fetch_paginates_until_short_page() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(GET).path("/data").query_param("$offset", "0");
            then.status(200).json_body(serde_json::json!([
                {"unique_key": "1"}, {"unique_key": "2"}
            ]));
        });
        let second = server.mock(|when, then| {
            when.method(GET).path("/data").query_param("$offset", "2");
            then.status(200).json_body(serde_json::json!([{"unique_key": "3"}]));
        });

        let mut config = MockConfig::new(server.url("/data"));
        config.page_size = 2;
        let batch = SocrataSource::new(config).fetch().await.unwrap();

        first.assert();
        second.assert();
        assert_eq!(batch.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_stops_at_max_records() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/data").query_param("$limit", "2");
            then.status(200).json_body(serde_json::json!([
                {"unique_key": "1"}, {"unique_key": "2"}
            ]));
        });

        let mut config = MockConfig::new(server.url("/data"));
        config.max_records = 2;
        let batch = SocrataSource::new(config).fetch().await.unwrap();

        api_mock.assert_hits(1);
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_sends_app_token() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/data").header("X-App-Token", "token-123");
            then.status(200).json_body(serde_json::json!([]));
        });

        let mut config = MockConfig::new(server.url("/data"));
        config.app_token = Some("token-123".to_string());
        let batch = SocrataSource::new(config).fetch().await.unwrap();

        api_mock.assert();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/data");
            then.status(500);
        });

        let mut config = MockConfig::new(server.url("/data"));
        config.retry_attempts = 2;
        let result = SocrataSource::new(config).fetch().await;

        api_mock.assert_hits(3);
        assert!(matches!(
            result,
            Err(QualityError::HttpStatusError { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/data");
            then.status(404);
        });

        let mut config = MockConfig::new(server.url("/data"));
        config.retry_attempts = 2;
        let result = SocrataSource::new(config).fetch().await;

        api_mock.assert_hits(1);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_object_payload_is_rejected() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/data");
            then.status(200)
                .json_body(serde_json::json!({"error": true, "message": "query timeout"}));
        });

        let result = SocrataSource::new(MockConfig::new(server.url("/data")))
            .fetch()
            .await;

        api_mock.assert();
        assert!(matches!(result, Err(QualityError::PayloadError { .. })));
    }

    #[tokio::test]
    async fn test_non_object_rows_are_skipped() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/data");
            then.status(200)
                .json_body(serde_json::json!([{"unique_key": "1"}, 42, "row", null]));
        });

        let batch = SocrataSource::new(MockConfig::new(server.url("/data")))
            .fetch()
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(batch.len(), 1);
    }
}
