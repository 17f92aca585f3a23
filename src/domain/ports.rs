use crate::domain::model::RecordBatch;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Settings the Socrata loader reads, regardless of where they came from.
pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn output_path(&self) -> &str;
    fn max_records(&self) -> usize;
    fn page_size(&self) -> usize;

    fn order_by(&self) -> &str {
        "created_date DESC"
    }

    fn app_token(&self) -> Option<&str> {
        None
    }

    /// Extra query parameters such as `$where`.
    fn query_parameters(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn retry_attempts(&self) -> u32 {
        2
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_secs(1)
    }
}

/// Anything that can hand the engine a batch of records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(&self) -> Result<RecordBatch>;

    /// Where the records come from, for logs.
    fn describe(&self) -> String;
}
