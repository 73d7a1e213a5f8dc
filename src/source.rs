//! Read-only access to a Trac SQLite database.
//!
//! Every query here is fixed and parameterless. Before a query runs, the
//! columns it touches are checked against the live schema so a database from an
//! incompatible Trac version fails with a clear schema error instead of a bare
//! SQL one.

use std::path::Path;

use rusqlite::{types::ValueRef, Connection, OpenFlags, Row};
use tracing::debug;

use crate::config::TimeUnit;
use crate::error::{ExtractError, Result};
use crate::model::{to_posix_seconds, Comment, Ticket};

const TICKET_TABLE: &str = "ticket";
const CHANGE_TABLE: &str = "ticket_change";

const TICKET_REQUIRED: [&str; 11] = [
    "id",
    "type",
    "owner",
    "reporter",
    "milestone",
    "status",
    "resolution",
    "summary",
    "description",
    "time",
    "changetime",
];

const CHANGE_REQUIRED: [&str; 5] = ["ticket", "time", "author", "field", "newvalue"];

const TICKETS_SQL: &str = r#"
    SELECT id, type, owner, reporter, milestone, status, resolution,
           summary, description, time, changetime
    FROM ticket
    ORDER BY id
"#;

const TICKETS_WITH_COMPONENT_SQL: &str = r#"
    SELECT id, type, owner, reporter, milestone, status, resolution,
           summary, description, time, changetime, component
    FROM ticket
    ORDER BY id
"#;

const COMMENTS_SQL: &str = r#"
    SELECT ticket, time, author, newvalue
    FROM ticket_change
    WHERE field = 'comment'
      AND newvalue IS NOT NULL
      AND newvalue <> ''
    ORDER BY ticket, time
"#;

pub struct TracSource {
    conn: Connection,
    time_unit: TimeUnit,
}

impl TracSource {
    /// Opens the database read-only. The connection is closed when the
    /// source is dropped.
    pub fn open(path: &Path, time_unit: TimeUnit) -> Result<Self> {
        let connect_err = |source| ExtractError::Connect {
            path: path.to_path_buf(),
            source,
        };

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(connect_err)?;

        // SQLite opens lazily; touch the header so "not a database" surfaces here.
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(connect_err)?;

        debug!(path = %path.display(), "opened Trac database read-only");
        Ok(Self::from_connection(conn, time_unit))
    }

    pub fn from_connection(conn: Connection, time_unit: TimeUnit) -> Self {
        Self { conn, time_unit }
    }

    /// Fails with `SchemaMismatch` if `table` is missing or lacks any of `required`.
    pub fn verify_columns(&self, table: &str, required: &[&str]) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1)")?;
        let columns: Vec<String> = stmt
            .query_map([table], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;

        if columns.is_empty() {
            return Err(ExtractError::SchemaMismatch {
                table: table.to_string(),
                column: None,
            });
        }

        for name in required {
            if !columns.iter().any(|c| c.eq_ignore_ascii_case(name)) {
                return Err(ExtractError::SchemaMismatch {
                    table: table.to_string(),
                    column: Some(name.to_string()),
                });
            }
        }

        debug!(table, columns = columns.len(), "schema verified");
        Ok(())
    }

    pub fn tickets(&self, include_component: bool) -> Result<Vec<Ticket>> {
        let mut required = TICKET_REQUIRED.to_vec();
        if include_component {
            required.push("component");
        }
        self.verify_columns(TICKET_TABLE, &required)?;

        let sql = if include_component {
            TICKETS_WITH_COMPONENT_SQL
        } else {
            TICKETS_SQL
        };
        debug!(sql = sql.trim(), "querying tickets");

        let unit = self.time_unit;
        let mut stmt = self.conn.prepare(sql)?;
        let tickets = stmt
            .query_map([], |row| {
                Ok(Ticket {
                    id: row.get(0)?,
                    ticket_type: text_value(row, 1)?,
                    owner: text_value(row, 2)?,
                    reporter: text_value(row, 3)?,
                    milestone: text_value(row, 4)?,
                    status: text_value(row, 5)?,
                    resolution: text_value(row, 6)?,
                    summary: text_value(row, 7)?,
                    description: text_value(row, 8)?,
                    posix_time: time_value(row, 9, unit)?,
                    modified_time: time_value(row, 10, unit)?,
                    component: if include_component {
                        text_value(row, 11)?
                    } else {
                        None
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tickets)
    }

    pub fn comments(&self) -> Result<Vec<Comment>> {
        self.verify_columns(CHANGE_TABLE, &CHANGE_REQUIRED)?;
        debug!(sql = COMMENTS_SQL.trim(), "querying comments");

        let unit = self.time_unit;
        let mut stmt = self.conn.prepare(COMMENTS_SQL)?;
        let comments = stmt
            .query_map([], |row| {
                Ok(Comment {
                    ticket: row.get(0)?,
                    posix_time: time_value(row, 1, unit)?,
                    author: text_value(row, 2)?,
                    text: text_value(row, 3)?.unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(comments)
    }
}

fn time_value(row: &Row<'_>, index: usize, unit: TimeUnit) -> rusqlite::Result<Option<i64>> {
    Ok(row
        .get::<_, Option<i64>>(index)?
        .map(|stored| to_posix_seconds(stored, unit)))
}

/// Reads a column as text whatever its storage class. Untyped columns in
/// hand-edited databases can hold numeric values such as a milestone `1.0`
/// stored as REAL; those are rendered the way SQLite prints them.
fn text_value(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(index)? {
        ValueRef::Null => None,
        ValueRef::Integer(v) => Some(v.to_string()),
        // Debug keeps the fractional part: 1.0 stays "1.0", not "1".
        ValueRef::Real(v) => Some(format!("{:?}", v)),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    })
}
