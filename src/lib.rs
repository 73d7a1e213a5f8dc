pub mod config;
pub mod error;
pub mod extractor;
pub mod model;
pub mod sink;
pub mod source;

pub use config::{ExtractorConfig, OutputFormat, TimeUnit};
pub use error::ExtractError;
pub use extractor::{ExportStats, Extractor, Selection};
pub use model::{Comment, Ticket};
