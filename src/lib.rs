pub mod analysis;
pub mod charts;
pub mod config;
pub mod document;
pub mod error;
pub mod fonts;
pub mod loader;
pub mod output;
pub mod pdf;
pub mod pipeline;
pub mod types;
pub mod util;

pub use config::ReportConfig;
pub use error::{ReportError, Result};
pub use pipeline::{run, RunOutcome};
