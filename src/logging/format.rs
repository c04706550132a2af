//! Log row layout, timestamps and file naming.

use crate::sensors::{AlarmLevel, Channel, Snapshot, CHANNEL_COUNT};
use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;

/// Row timestamp, e.g. `17/10/2026 14:03:09.042`.
pub const ROW_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S%.3f";

/// Filename timestamp, e.g. `20261017_140309`.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Number of fields in every row and in the header.
pub const COLUMN_COUNT: usize = 2 + 2 * CHANNEL_COUNT;

/// Decimal places used for sensor values in rows.
pub const VALUE_PRECISION: usize = 3;

/// Time zone used to render timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// Host local time.
    #[default]
    Local,
    Named(Tz),
}

impl Zone {
    /// Resolve an optional IANA name; `None` means host local time.
    pub fn from_name(name: Option<&str>) -> Result<Self, String> {
        match name {
            None => Ok(Zone::Local),
            Some(name) => name
                .parse::<Tz>()
                .map(Zone::Named)
                .map_err(|e| format!("invalid timezone '{name}': {e}")),
        }
    }

    pub fn format(&self, at: DateTime<Utc>, fmt: &str) -> String {
        match self {
            Zone::Local => at.with_timezone(&Local).format(fmt).to_string(),
            Zone::Named(tz) => at.with_timezone(tz).format(fmt).to_string(),
        }
    }

    pub fn row_timestamp(&self, at: DateTime<Utc>) -> String {
        self.format(at, ROW_TIMESTAMP_FORMAT)
    }

    pub fn file_timestamp(&self, at: DateTime<Utc>) -> String {
        self.format(at, FILE_TIMESTAMP_FORMAT)
    }
}

/// Make a session id safe for use inside a filename.
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '\\' | ' ' | ':' => '-',
            c => c,
        })
        .collect()
}

/// The 14-column CSV header.
pub fn header() -> String {
    let mut columns = vec!["timestamp", "session_id"];
    columns.extend(Channel::ALL.iter().map(|c| c.value_column()));
    columns.extend(Channel::ALL.iter().map(|c| c.alarm_column()));
    columns.join(",")
}

/// Errors from parsing a log row.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowParseError {
    #[error("expected {COLUMN_COUNT} fields, found {0}")]
    FieldCount(usize),
    #[error("unterminated quoted field")]
    UnterminatedQuote,
    #[error("invalid value in column {column}: {value}")]
    Value { column: &'static str, value: String },
    #[error("invalid alarm level in column {column}: {value}")]
    Alarm { column: &'static str, value: String },
}

/// One logged sample.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub timestamp: String,
    pub session_id: String,
    pub values: [f64; CHANNEL_COUNT],
    pub alarms: [AlarmLevel; CHANNEL_COUNT],
}

impl LogRow {
    /// Build a row from a snapshot, classifying every channel.
    pub fn from_snapshot(timestamp: String, session_id: &str, snapshot: &Snapshot) -> Self {
        let values = *snapshot.values();
        let alarms = Channel::ALL.map(|c| c.thresholds().classify(values[c.index()]));
        Self {
            timestamp,
            session_id: session_id.to_string(),
            values,
            alarms,
        }
    }

    /// Render as one CSV line without the trailing newline.
    pub fn to_csv_line(&self) -> String {
        let mut fields = Vec::with_capacity(COLUMN_COUNT);
        fields.push(quote(&self.timestamp));
        fields.push(quote(&self.session_id));
        fields.extend(
            self.values
                .iter()
                .map(|v| format!("{v:.prec$}", prec = VALUE_PRECISION)),
        );
        fields.extend(self.alarms.iter().map(|a| a.as_str().to_string()));
        fields.join(",")
    }

    /// Parse a line produced by [`to_csv_line`](Self::to_csv_line).
    pub fn parse(line: &str) -> Result<Self, RowParseError> {
        let fields = split_fields(line.trim_end_matches(['\r', '\n']))?;
        if fields.len() != COLUMN_COUNT {
            return Err(RowParseError::FieldCount(fields.len()));
        }

        let mut values = [0.0; CHANNEL_COUNT];
        let mut alarms = [AlarmLevel::Ok; CHANNEL_COUNT];
        for channel in Channel::ALL {
            let i = channel.index();
            let raw = &fields[2 + i];
            values[i] = raw.parse().map_err(|_| RowParseError::Value {
                column: channel.value_column(),
                value: raw.clone(),
            })?;
            let raw = &fields[2 + CHANNEL_COUNT + i];
            alarms[i] = AlarmLevel::parse(raw).ok_or_else(|| RowParseError::Alarm {
                column: channel.alarm_column(),
                value: raw.clone(),
            })?;
        }

        let mut fields = fields.into_iter();
        Ok(Self {
            timestamp: fields.next().unwrap_or_default(),
            session_id: fields.next().unwrap_or_default(),
            values,
            alarms,
        })
    }
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn split_fields(line: &str) -> Result<Vec<String>, RowParseError> {
    let mut fields = Vec::with_capacity(COLUMN_COUNT);
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    if in_quotes {
        return Err(RowParseError::UnterminatedQuote);
    }
    fields.push(current);
    Ok(fields)
}
