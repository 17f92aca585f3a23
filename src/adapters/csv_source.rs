use crate::core::{Field, FieldValue, Record, RecordBatch, RecordSource, Storage};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Loads service requests from a CSV export of the dataset.
///
/// Headers may use either API names (`created_date`) or the portal's export
/// names (`Created Date`). Columns outside the known vocabulary are ignored.
pub struct CsvSource<S: Storage> {
    storage: S,
    path: String,
}

impl<S: Storage> CsvSource<S> {
    pub fn new(storage: S, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
        }
    }
}

pub fn parse_csv(data: &[u8]) -> Result<RecordBatch> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let columns: Vec<Option<Field>> = reader
        .headers()?
        .iter()
        .map(Field::from_column)
        .collect();

    if columns.iter().all(Option::is_none) {
        tracing::warn!("CSV header has no known 311 columns; every field will be absent");
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = Record::new();
        for (field, cell) in columns.iter().zip(row.iter()) {
            if let Some(field) = field {
                record.set(*field, FieldValue::decode(*field, cell));
            }
        }
        records.push(record);
    }

    Ok(RecordBatch::new(records))
}

#[async_trait]
impl<S: Storage> RecordSource for CsvSource<S> {
    async fn fetch(&self) -> Result<RecordBatch> {
        let data = self.storage.read_file(&self.path).await?;
        tracing::debug!("Read {} bytes from {}", data.len(), self.path);
        parse_csv(&data)
    }

    fn describe(&self) -> String {
        format!("CSV file {}", self.path)
    }
}
