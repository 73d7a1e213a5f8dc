//! CSV and Parquet writers for extracted rows.
//!
//! Output goes to `<path>.partial` first and is renamed into place only once
//! fully written, so a failed run leaves no truncated file behind.

use std::{
    ffi::OsString,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow::{
    array::{ArrayRef, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{
    arrow::ArrowWriter,
    basic::Compression,
    file::properties::WriterProperties,
};
use sha2::{Digest, Sha256};

use crate::config::{ExtractorConfig, OutputFormat};
use crate::error::{ExtractError, Result};
use crate::model::{ticket_headers, Comment, Ticket, COMMENT_COLUMNS};

const WRITE_BUFFER: usize = 1024 * 1024;

pub fn write_tickets(path: &Path, tickets: &[Ticket], config: &ExtractorConfig) -> Result<()> {
    write_atomically(path, |out| match config.format {
        OutputFormat::Csv => tickets_csv(out, tickets, config),
        OutputFormat::Parquet => {
            let batch = tickets_batch(tickets, config.include_component)?;
            write_parquet(out, &batch, config.use_compression)
        }
    })
}

pub fn write_comments(path: &Path, comments: &[Comment], config: &ExtractorConfig) -> Result<()> {
    write_atomically(path, |out| match config.format {
        OutputFormat::Csv => comments_csv(out, comments, config.write_header),
        OutputFormat::Parquet => {
            let batch = comments_batch(comments)?;
            write_parquet(out, &batch, config.use_compression)
        }
    })
}

/// SHA-256 of a file, lowercase hex.
pub fn file_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| ExtractError::output(path, e))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(|e| ExtractError::output(path, e))?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let partial = partial_path(path);
    let file = File::create(&partial).map_err(|e| ExtractError::output(path, e))?;
    let mut out = BufWriter::with_capacity(WRITE_BUFFER, file);

    let result = write(&mut out)
        .and_then(|_| out.flush().map_err(|e| ExtractError::output(path, e)))
        .and_then(|_| {
            out.get_ref()
                .sync_all()
                .map_err(|e| ExtractError::output(path, e))
        });
    drop(out);

    match result {
        Ok(()) => fs::rename(&partial, path).map_err(|e| {
            let _ = fs::remove_file(&partial);
            ExtractError::output(path, e)
        }),
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e)
        }
    }
}

fn tickets_csv<W: Write>(out: W, tickets: &[Ticket], config: &ExtractorConfig) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    if config.write_header {
        writer.write_record(ticket_headers(config.include_component))?;
    }

    for ticket in tickets {
        let mut record: Vec<String> = Vec::with_capacity(12);
        record.push(ticket.id.to_string());
        record.extend(
            ticket
                .text_fields()
                .iter()
                .map(|f| f.unwrap_or_default().to_string()),
        );
        record.push(optional_number(ticket.posix_time));
        record.push(optional_number(ticket.modified_time));
        if config.include_component {
            record.push(ticket.component.clone().unwrap_or_default());
        }
        writer.write_record(&record)?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn comments_csv<W: Write>(out: W, comments: &[Comment], write_header: bool) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    if write_header {
        writer.write_record(COMMENT_COLUMNS)?;
    }

    for comment in comments {
        writer.write_record([
            comment.ticket.to_string().as_str(),
            optional_number(comment.posix_time).as_str(),
            comment.author.as_deref().unwrap_or_default(),
            comment.text.as_str(),
        ])?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// NULL timestamps become empty fields.
fn optional_number(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn tickets_batch(tickets: &[Ticket], include_component: bool) -> Result<RecordBatch> {
    let headers = ticket_headers(include_component);
    let mut fields = Vec::with_capacity(headers.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(headers.len());

    fields.push(Field::new(headers[0], DataType::Int64, false));
    arrays.push(Arc::new(Int64Array::from_iter_values(tickets.iter().map(|t| t.id))));

    for (i, name) in headers[1..9].iter().enumerate() {
        fields.push(Field::new(*name, DataType::Utf8, true));
        let column: StringArray = tickets.iter().map(|t| t.text_fields()[i]).collect();
        arrays.push(Arc::new(column));
    }

    fields.push(Field::new(headers[9], DataType::Int64, true));
    arrays.push(Arc::new(tickets.iter().map(|t| t.posix_time).collect::<Int64Array>()));
    fields.push(Field::new(headers[10], DataType::Int64, true));
    arrays.push(Arc::new(tickets.iter().map(|t| t.modified_time).collect::<Int64Array>()));

    if include_component {
        fields.push(Field::new(headers[11], DataType::Utf8, true));
        let column: StringArray = tickets.iter().map(|t| t.component.as_deref()).collect();
        arrays.push(Arc::new(column));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

fn comments_batch(comments: &[Comment]) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new(COMMENT_COLUMNS[0], DataType::Int64, false),
        Field::new(COMMENT_COLUMNS[1], DataType::Int64, true),
        Field::new(COMMENT_COLUMNS[2], DataType::Utf8, true),
        Field::new(COMMENT_COLUMNS[3], DataType::Utf8, false),
    ]);

    let author: StringArray = comments.iter().map(|c| c.author.as_deref()).collect();
    let arrays: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(comments.iter().map(|c| c.ticket))),
        Arc::new(comments.iter().map(|c| c.posix_time).collect::<Int64Array>()),
        Arc::new(author),
        Arc::new(StringArray::from_iter_values(comments.iter().map(|c| c.text.as_str()))),
    ];

    Ok(RecordBatch::try_new(Arc::new(schema), arrays)?)
}

fn write_parquet<W: Write + Send>(out: W, batch: &RecordBatch, compress: bool) -> Result<()> {
    let props = WriterProperties::builder()
        .set_compression(if compress {
            Compression::SNAPPY
        } else {
            Compression::UNCOMPRESSED
        })
        .set_dictionary_enabled(false)
        .build();

    let mut writer = ArrowWriter::try_new(out, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn comment(ticket: i64, posix_time: i64, text: &str) -> Comment {
        Comment {
            ticket,
            posix_time: Some(posix_time),
            author: Some("alice".into()),
            text: text.into(),
        }
    }

    #[test]
    fn csv_quotes_embedded_commas_and_newlines() {
        let mut buf = Vec::new();
        comments_csv(&mut buf, &[comment(5, 200, "a, b\nc")], true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "ticket,PosixTime,author,newvalue\n5,200,alice,\"a, b\nc\"\n");
    }

    #[test]
    fn header_can_be_suppressed() {
        let mut buf = Vec::new();
        comments_csv(&mut buf, &[comment(1, 2, "x")], false).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1,2,alice,x\n");
    }

    #[test]
    fn failed_write_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("comments.csv");

        let result = write_atomically(&path, |_| {
            Err(ExtractError::SchemaMismatch {
                table: "ticket_change".into(),
                column: None,
            })
        });

        assert!(result.is_err());
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn unwritable_destination_is_an_output_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("tickets.csv");
        let config = ExtractorConfig::new("unused.db", dir.path());

        match write_tickets(&path, &[], &config) {
            Err(ExtractError::Output { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected output error, got {:?}", other),
        }
    }

    #[test]
    fn digest_is_hex_sha256() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();
        assert_eq!(
            file_digest(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn ticket_batch_keeps_nulls() {
        let ticket = Ticket {
            id: 1,
            ticket_type: Some("defect".into()),
            owner: None,
            reporter: Some("bob".into()),
            milestone: None,
            status: Some("new".into()),
            resolution: None,
            summary: Some("crash".into()),
            description: Some("it crashes".into()),
            posix_time: Some(10),
            modified_time: None,
            component: Some("core".into()),
        };
        let batch = tickets_batch(&[ticket], true).unwrap();
        assert_eq!(batch.num_columns(), 12);
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.column(2).null_count(), 1);
        assert_eq!(batch.column(10).null_count(), 1);
        assert_eq!(batch.schema().field(11).name(), "component");
    }
}
