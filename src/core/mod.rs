pub mod audit;
pub mod cardinality;
pub mod completeness;
pub mod consistency;
pub mod engine;
pub mod scoring;
pub mod summary;
#[cfg(test)]
pub(crate) mod test_support;
pub mod timeliness;
pub mod writer;

pub use crate::domain::model::{Field, FieldValue, Record, RecordBatch};
pub use crate::domain::ports::{ConfigProvider, RecordSource, Storage};
pub use crate::utils::error::Result;
