pub mod etl;
pub mod filter;
pub mod paginator;
pub mod sync_engine;

pub use crate::domain::model::{Record, RecordBatch, SheetTarget};
pub use crate::domain::ports::{RecordSink, RecordSource, SpreadsheetProvider, Storage, TokenProvider};
pub use crate::utils::error::Result;
