pub mod adapters;
#[cfg(feature = "cli")]
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::storage::LocalStorage;
pub use config::ExportConfig;
pub use core::{
    etl::{ExportEngine, ExportOptions},
    sync_engine::{SheetSink, SyncEngine},
};
pub use domain::model::{ExportResult, Record, SheetTarget, SyncOutcome};
pub use utils::error::{ExportError, Result};
