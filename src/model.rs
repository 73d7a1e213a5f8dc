//! Row types produced by the extractor.

use crate::config::TimeUnit;

const MICROS_PER_SECOND: i64 = 1_000_000;

pub const TICKET_COLUMNS: [&str; 11] = [
    "id",
    "type",
    "owner",
    "reporter",
    "milestone",
    "status",
    "resolution",
    "summary",
    "description",
    "PosixTime",
    "ModifiedTime",
];

pub const COMPONENT_COLUMN: &str = "component";

pub const COMMENT_COLUMNS: [&str; 4] = ["ticket", "PosixTime", "author", "newvalue"];

/// One row of the `ticket` table, times already in POSIX seconds.
/// Trac does not declare `time`/`changetime` NOT NULL, so either may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: i64,
    pub ticket_type: Option<String>,
    pub owner: Option<String>,
    pub reporter: Option<String>,
    pub milestone: Option<String>,
    pub status: Option<String>,
    pub resolution: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub posix_time: Option<i64>,
    pub modified_time: Option<i64>,
    /// Only populated when the component column was requested.
    pub component: Option<String>,
}

/// A `ticket_change` row with `field = 'comment'` and non-empty text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub ticket: i64,
    pub posix_time: Option<i64>,
    pub author: Option<String>,
    pub text: String,
}

impl Ticket {
    /// Text fields in header order, `id` and times excluded.
    pub fn text_fields(&self) -> [Option<&str>; 8] {
        [
            self.ticket_type.as_deref(),
            self.owner.as_deref(),
            self.reporter.as_deref(),
            self.milestone.as_deref(),
            self.status.as_deref(),
            self.resolution.as_deref(),
            self.summary.as_deref(),
            self.description.as_deref(),
        ]
    }
}

pub fn ticket_headers(include_component: bool) -> Vec<&'static str> {
    let mut headers = TICKET_COLUMNS.to_vec();
    if include_component {
        headers.push(COMPONENT_COLUMN);
    }
    headers
}

/// Converts a stored Trac timestamp to POSIX seconds.
pub fn to_posix_seconds(stored: i64, unit: TimeUnit) -> i64 {
    match unit {
        TimeUnit::Micros => stored.div_euclid(MICROS_PER_SECOND),
        TimeUnit::Seconds => stored,
    }
}
