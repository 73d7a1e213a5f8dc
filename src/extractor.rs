//! Trac ticket and comment extraction.
//!
//! Single-threaded, one read-only connection per `Extractor`:
//! - tickets ordered by id, one row per ticket
//! - comments ordered by (ticket, time), empty text dropped
//! - every time column normalised to POSIX seconds

use std::{fs::create_dir_all, path::PathBuf, time::Instant};

use clap::ValueEnum;
use tracing::info;

use crate::config::ExtractorConfig;
use crate::error::{ExtractError, Result};
use crate::model::{Comment, Ticket};
use crate::sink;
use crate::source::TracSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Selection {
    Tickets,
    Comments,
    All,
}

#[derive(Debug, Clone)]
pub struct ExportStats {
    pub path: PathBuf,
    pub rows_extracted: usize,
    pub duration_secs: f64,
    pub file_size_mb: f64,
    pub sha256: String,
}

pub struct Extractor {
    config: ExtractorConfig,
    source: TracSource,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        let source = TracSource::open(&config.database_path, config.time_unit)?;
        Ok(Self { config, source })
    }

    pub fn fetch_tickets(&self) -> Result<Vec<Ticket>> {
        self.source.tickets(self.config.include_component)
    }

    pub fn fetch_comments(&self) -> Result<Vec<Comment>> {
        self.source.comments()
    }

    pub fn export_tickets(&self) -> Result<ExportStats> {
        let start = Instant::now();
        let path = self.prepare_output("tickets")?;
        info!("extracting tickets → {}", path.display());

        let tickets = self.fetch_tickets()?;
        sink::write_tickets(&path, &tickets, &self.config)?;
        self.finish(path, tickets.len(), start)
    }

    pub fn export_comments(&self) -> Result<ExportStats> {
        let start = Instant::now();
        let path = self.prepare_output("comments")?;
        info!("extracting comments → {}", path.display());

        let comments = self.fetch_comments()?;
        sink::write_comments(&path, &comments, &self.config)?;
        self.finish(path, comments.len(), start)
    }

    /// Runs the selected exports in order; the first failure aborts the run.
    pub fn export(&self, selection: Selection) -> Result<Vec<ExportStats>> {
        match selection {
            Selection::Tickets => Ok(vec![self.export_tickets()?]),
            Selection::Comments => Ok(vec![self.export_comments()?]),
            Selection::All => Ok(vec![self.export_tickets()?, self.export_comments()?]),
        }
    }

    fn prepare_output(&self, stem: &str) -> Result<PathBuf> {
        create_dir_all(&self.config.out_dir)
            .map_err(|e| ExtractError::output(&self.config.out_dir, e))?;
        Ok(self.config.output_path(stem))
    }

    fn finish(&self, path: PathBuf, rows: usize, start: Instant) -> Result<ExportStats> {
        let duration = start.elapsed().as_secs_f64();
        let file_size_mb = std::fs::metadata(&path)
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .map_err(|e| ExtractError::output(&path, e))?;
        let sha256 = sink::file_digest(&path)?;

        info!(
            "done: {} rows → {} in {} ({:.2} MB)",
            format_number(rows as i64),
            path.display(),
            format_duration(duration),
            file_size_mb
        );

        Ok(ExportStats {
            path,
            rows_extracted: rows,
            duration_secs: duration,
            file_size_mb,
            sha256,
        })
    }
}

pub fn format_number(n: i64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() / 3));
    let chars: Vec<char> = s.chars().collect();

    for (i, ch) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 && chars[i - 1] != '-' {
            result.push(',');
        }
        result.push(*ch);
    }

    result
}

pub fn format_duration(secs: f64) -> String {
    let total_secs = secs as u64;
    let mins = total_secs / 60;
    let remaining_secs = total_secs % 60;

    if mins > 0 {
        format!("{}m {}s", mins, remaining_secs)
    } else {
        format!("{:.1}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeUnit;
    use rusqlite::Connection;
    use tempfile::TempDir;

    #[test]
    fn vanished_output_file_is_an_output_error() {
        let dir = TempDir::new().unwrap();
        let extractor = Extractor {
            config: ExtractorConfig::new("unused.db", dir.path()),
            source: TracSource::from_connection(
                Connection::open_in_memory().unwrap(),
                TimeUnit::Micros,
            ),
        };
        let gone = dir.path().join("tickets.csv");

        match extractor.finish(gone.clone(), 0, Instant::now()) {
            Err(ExtractError::Output { path, .. }) => assert_eq!(path, gone),
            other => panic!("expected output error, got {:?}", other),
        }
    }

    #[test]
    fn numbers_get_thousands_separators() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
        assert_eq!(format_number(-123_456), "-123,456");
    }

    #[test]
    fn durations_switch_to_minutes() {
        assert_eq!(format_duration(2.5), "2.5s");
        assert_eq!(format_duration(125.0), "2m 5s");
    }
}
