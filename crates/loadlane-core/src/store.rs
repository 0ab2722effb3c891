//! Request-log persistence.
//!
//! The on-disk format is the flat Locust-style request log, one row per
//! record:
//!
//! ```text
//! timestamp,name,http_method,response_time,success,locust_user_id,start,end
//! ```
//!
//! `http_method` is the literal `action` for synthetic timed scopes and
//! the verb for real HTTP calls; `success` serializes as `True`/`False`;
//! `timestamp` and `response_time` (milliseconds) are bookkeeping derived
//! from the interval. Loading is strict: a malformed row is an error, not
//! a skip — this feeds an offline reporting tool that should fail loudly.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{ActionRecord, RequestKind, UserId};

/// Errors raised while reading or writing the request log.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error on the underlying file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV syntax or column error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The `http_method` column held an unknown literal.
    #[error("unknown http_method `{0}`")]
    UnknownMethod(String),
}

/// Convenient result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// One row of the request log, column order as written.
#[derive(Debug, Serialize, Deserialize)]
struct LogRow {
    timestamp: f64,
    name: String,
    http_method: String,
    response_time: f64,
    #[serde(with = "python_bool")]
    success: bool,
    locust_user_id: u64,
    start: f64,
    end: f64,
}

impl From<&ActionRecord> for LogRow {
    fn from(record: &ActionRecord) -> Self {
        Self {
            timestamp: record.end,
            name: record.name.clone(),
            http_method: record.kind.as_str().to_string(),
            response_time: record.duration() * 1000.0,
            success: record.success,
            locust_user_id: record.user_id.as_u64(),
            start: record.start,
            end: record.end,
        }
    }
}

impl TryFrom<LogRow> for ActionRecord {
    type Error = StoreError;

    fn try_from(row: LogRow) -> StoreResult<Self> {
        let kind = row
            .http_method
            .parse::<RequestKind>()
            .map_err(|()| StoreError::UnknownMethod(row.http_method))?;
        Ok(Self {
            name: row.name,
            kind,
            start: row.start,
            end: row.end,
            success: row.success,
            user_id: UserId::new(row.locust_user_id),
        })
    }
}

/// Writes the request log with its contractual header.
///
/// # Errors
///
/// Returns `StoreError` on I/O or serialization failure.
pub fn write_records<W: Write>(records: &[ActionRecord], writer: W) -> StoreResult<()> {
    let mut out = csv::Writer::from_writer(writer);
    for record in records {
        out.serialize(LogRow::from(record))?;
    }
    out.flush()?;
    Ok(())
}

/// Reads a request log written by [`write_records`] (or by Locust with
/// the same column layout).
///
/// # Errors
///
/// Returns `StoreError` on the first malformed row.
pub fn read_records<R: Read>(reader: R) -> StoreResult<Vec<ActionRecord>> {
    let mut input = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in input.deserialize::<LogRow>() {
        records.push(ActionRecord::try_from(row?)?);
    }
    Ok(records)
}

/// Saves the request log to `path`.
///
/// # Errors
///
/// Returns `StoreError` when the file cannot be created or written.
pub fn save_csv<P: AsRef<Path>>(path: P, records: &[ActionRecord]) -> StoreResult<()> {
    let file = File::create(path)?;
    write_records(records, file)
}

/// Loads a request log from `path`.
///
/// # Errors
///
/// Returns `StoreError` when the file cannot be opened or parsed.
pub fn load_csv<P: AsRef<Path>>(path: P) -> StoreResult<Vec<ActionRecord>> {
    let file = File::open(path)?;
    read_records(file)
}

/// `success` column codec: the log stores the literals `True`/`False`.
mod python_bool {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match String::deserialize(deserializer)?.as_str() {
            "True" => Ok(true),
            "False" => Ok(false),
            other => Err(D::Error::custom(format!(
                "expected `True` or `False`, got `{other}`"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn sample() -> Vec<ActionRecord> {
        vec![
            ActionRecord {
                name: "Iteration".to_string(),
                kind: RequestKind::Action,
                start: 100.0,
                end: 110.0,
                success: false,
                user_id: UserId::new(1),
            },
            ActionRecord {
                name: "Iteration:Step A".to_string(),
                kind: RequestKind::Action,
                start: 100.0,
                end: 103.0,
                success: true,
                user_id: UserId::new(1),
            },
            ActionRecord {
                name: "/livereport/rows".to_string(),
                kind: RequestKind::Get,
                start: 100.5,
                end: 100.75,
                success: true,
                user_id: UserId::new(2),
            },
        ]
    }

    #[test]
    fn header_and_literals_match_the_contract() {
        let mut buf = Vec::new();
        write_records(&sample(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,name,http_method,response_time,success,locust_user_id,start,end"
        );
        assert!(text.contains(",action,"));
        assert!(text.contains(",GET,"));
        assert!(text.contains(",False,"));
        assert!(text.contains(",True,"));
    }

    #[test]
    fn records_survive_a_disk_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let records = sample();
        save_csv(file.path(), &records).unwrap();
        let loaded = load_csv(file.path()).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn unknown_method_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "timestamp,name,http_method,response_time,success,locust_user_id,start,end\n\
             1.0,x,TRACE,1.0,True,1,0.0,1.0"
        )
        .unwrap();
        let err = load_csv(file.path()).unwrap_err();
        assert!(matches!(err, StoreError::UnknownMethod(m) if m == "TRACE"));
    }

    #[test]
    fn lowercase_success_literal_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "timestamp,name,http_method,response_time,success,locust_user_id,start,end\n\
             1.0,x,action,1.0,true,1,0.0,1.0"
        )
        .unwrap();
        assert!(matches!(
            load_csv(file.path()),
            Err(StoreError::Csv(_))
        ));
    }

    #[test]
    fn non_numeric_timestamp_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "timestamp,name,http_method,response_time,success,locust_user_id,start,end\n\
             yesterday,x,action,1.0,True,1,0.0,1.0"
        )
        .unwrap();
        assert!(matches!(load_csv(file.path()), Err(StoreError::Csv(_))));
    }
}
