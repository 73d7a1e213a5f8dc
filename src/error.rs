use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to open Trac database {}", .path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{}", schema_message(.table, .column.as_deref()))]
    SchemaMismatch { table: String, column: Option<String> },

    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("failed to write {}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("arrow encoding failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet encoding failed: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

fn schema_message(table: &str, column: Option<&str>) -> String {
    match column {
        Some(column) => format!("schema mismatch: table `{}` has no column `{}`", table, column),
        None => format!("schema mismatch: table `{}` does not exist", table),
    }
}

impl ExtractError {
    pub(crate) fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExtractError::Output {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_mismatch_names_table_and_column() {
        let err = ExtractError::SchemaMismatch {
            table: "ticket_change".into(),
            column: Some("newvalue".into()),
        };
        assert_eq!(
            err.to_string(),
            "schema mismatch: table `ticket_change` has no column `newvalue`"
        );

        let err = ExtractError::SchemaMismatch {
            table: "ticket".into(),
            column: None,
        };
        assert_eq!(err.to_string(), "schema mismatch: table `ticket` does not exist");
    }
}
