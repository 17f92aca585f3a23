// Adapters layer: concrete record sources for the quality engine.

pub mod csv_source;
pub mod socrata;

pub use csv_source::CsvSource;
pub use socrata::{SocrataSource, NYC_311_ENDPOINT};
