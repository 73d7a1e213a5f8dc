use std::path::PathBuf;

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Unit the source database stores `time`/`changetime` in.
/// Trac 0.12 and later use microseconds; older schemas use seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimeUnit {
    Micros,
    Seconds,
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub database_path: PathBuf,
    pub out_dir: PathBuf,
    pub format: OutputFormat,
    pub time_unit: TimeUnit,
    pub include_component: bool,
    pub write_header: bool,
    pub use_compression: bool,
}

impl ExtractorConfig {
    pub fn new(database_path: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            out_dir: out_dir.into(),
            format: OutputFormat::Csv,
            time_unit: TimeUnit::Micros,
            include_component: false,
            write_header: true,
            use_compression: false,
        }
    }

    pub fn output_path(&self, stem: &str) -> PathBuf {
        self.out_dir.join(format!("{}.{}", stem, self.format.extension()))
    }
}
