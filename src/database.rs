//! MySQL access for a single export.
//!
//! One connection per request: connect, prepare the query to learn its
//! columns, execute it, and drain the row stream into a [`ResultSet`].
//! Statements MySQL refuses to prepare run over the text protocol instead.

use std::fmt;

use futures_util::TryStreamExt;
use log::{debug, warn};
use sqlx::error::BoxDynError;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow};
use sqlx::{Column, Connection, Executor, Row, Statement, TypeInfo, ValueRef};

use crate::error::ExportError;
use crate::types::{CellValue, ExportRequest, ResultSet};

pub(crate) const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Connection parameters derived from an [`ExportRequest`].
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct ConnectionDescriptor {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: Option<u16>,
    pub database: String,
}

impl ConnectionDescriptor {
    pub fn from_request(request: &ExportRequest) -> Self {
        let (host, port) = split_host_port(&request.db_host);
        Self {
            user: request.db_user.clone(),
            password: request.db_password.clone(),
            host,
            port,
            database: request.db_name.clone(),
        }
    }

    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port.unwrap_or(DEFAULT_MYSQL_PORT))
            .username(&self.user)
            .password(&self.password);
        if self.database.is_empty() {
            options
        } else {
            options.database(&self.database)
        }
    }
}

// DSN form with the password masked.
impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:***@tcp({}", self.user, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        write!(f, ")/{}", self.database)
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionDescriptor({})", self)
    }
}

/// Splits `host`, `host:port` and `[v6]:port`. A suffix that is not a port
/// number stays part of the host.
fn split_host_port(raw: &str) -> (String, Option<u16>) {
    if let Some(rest) = raw.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse().ok());
            return (host.to_string(), port);
        }
        return (raw.to_string(), None);
    }

    match raw.rsplit_once(':') {
        // bare IPv6 address, no port
        Some((host, _)) if host.contains(':') => (raw.to_string(), None),
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_string(), Some(port)),
            Err(_) => (raw.to_string(), None),
        },
        None => (raw.to_string(), None),
    }
}

/// Wire format the rows of a query arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Protocol {
    /// Prepared statement; temporal values come as packed binary.
    Binary,
    /// Plain `COM_QUERY`; every value is text.
    Text,
}

/// MySQL error number for statements the prepared protocol rejects
/// (`ER_UNSUPPORTED_PS`), e.g. `LOCK TABLES` or `HANDLER ... READ`.
const ER_UNSUPPORTED_PS: u16 = 1295;

/// Runs `query` against the database described by `descriptor`.
pub(crate) async fn fetch_result_set(
    descriptor: &ConnectionDescriptor,
    query: &str,
) -> Result<ResultSet, ExportError> {
    let mut conn = MySqlConnection::connect_with(&descriptor.connect_options())
        .await
        .map_err(ExportError::Connection)?;
    debug!("Connected to {}", descriptor);

    let outcome = read_result_set(&mut conn, query).await;

    if let Err(e) = conn.close().await {
        warn!("Failed to close connection to {}: {}", descriptor, e);
    }

    outcome
}

async fn read_result_set(conn: &mut MySqlConnection, query: &str) -> Result<ResultSet, ExportError> {
    let prepared = (&mut *conn).prepare(query).await;
    let statement = match prepared {
        Ok(statement) => statement,
        Err(e) if is_unsupported_by_prepare(&e) => {
            debug!("Statement cannot be prepared, running it as plain text: {}", e);
            return read_unprepared(conn, query).await;
        }
        Err(e) => return Err(ExportError::Query(e)),
    };

    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let mut result_set = ResultSet::new(columns);

    let mut rows = statement.query().fetch(&mut *conn);
    while let Some(row) = rows.try_next().await.map_err(ExportError::Query)? {
        push_checked(&mut result_set, decode_row(&row, Protocol::Binary)?)?;
    }

    Ok(result_set)
}

/// Text-protocol path. Without a prepared statement the column list is only
/// known once the first row arrives; an empty result has no header.
async fn read_unprepared(conn: &mut MySqlConnection, query: &str) -> Result<ResultSet, ExportError> {
    let mut result_set: Option<ResultSet> = None;

    let mut rows = (&mut *conn).fetch(query);
    while let Some(row) = rows.try_next().await.map_err(ExportError::Query)? {
        let result_set = result_set.get_or_insert_with(|| {
            ResultSet::new(row.columns().iter().map(|c| c.name().to_string()).collect())
        });
        push_checked(result_set, decode_row(&row, Protocol::Text)?)?;
    }

    Ok(result_set.unwrap_or_default())
}

fn is_unsupported_by_prepare(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .try_downcast_ref::<MySqlDatabaseError>()
            .map(|e| e.number() == ER_UNSUPPORTED_PS)
            .unwrap_or(false),
        _ => false,
    }
}

fn push_checked(result_set: &mut ResultSet, values: Vec<CellValue>) -> Result<(), ExportError> {
    result_set.push_row(values).map_err(|values| {
        ExportError::Schema(format!(
            "row has {} values but the statement reported {} columns",
            values.len(),
            result_set.column_count()
        ))
    })
}

fn decode_row(row: &MySqlRow, protocol: Protocol) -> Result<Vec<CellValue>, ExportError> {
    (0..row.len())
        .map(|idx| decode_cell(row, idx, protocol).map_err(ExportError::RowScan))
        .collect()
}

/// How a MySQL column type is turned into a [`CellValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnClass {
    Signed,
    Unsigned,
    Float,
    Decimal,
    Date,
    DateTime,
    Time,
    Bytes,
    Other,
}

impl ColumnClass {
    pub fn of(type_name: &str) -> Self {
        let name = type_name.to_ascii_uppercase();
        let base = name.split_whitespace().next().unwrap_or("");
        let unsigned = name.contains("UNSIGNED");

        match base {
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" if unsigned => {
                ColumnClass::Unsigned
            }
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "BOOLEAN" => {
                ColumnClass::Signed
            }
            "YEAR" | "BIT" => ColumnClass::Unsigned,
            "FLOAT" | "DOUBLE" => ColumnClass::Float,
            "DECIMAL" | "NUMERIC" => ColumnClass::Decimal,
            "DATE" => ColumnClass::Date,
            "DATETIME" | "TIMESTAMP" => ColumnClass::DateTime,
            "TIME" => ColumnClass::Time,
            "ENUM" | "SET" | "JSON" => ColumnClass::Bytes,
            _ if base.contains("CHAR")
                || base.contains("TEXT")
                || base.contains("BLOB")
                || base.contains("BINARY") =>
            {
                ColumnClass::Bytes
            }
            _ => ColumnClass::Other,
        }
    }
}

fn decode_cell(row: &MySqlRow, idx: usize, protocol: Protocol) -> Result<CellValue, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(CellValue::null());
    }
    let class = ColumnClass::of(raw.type_info().name());

    let value = match class {
        ColumnClass::Signed => CellValue::Integer(row.try_get_unchecked::<i64, _>(idx)?),
        ColumnClass::Unsigned => unsigned_cell(row.try_get_unchecked::<u64, _>(idx)?),
        ColumnClass::Float => CellValue::Float(row.try_get_unchecked::<f64, _>(idx)?),
        ColumnClass::Decimal => decimal_cell(row.try_get_unchecked::<String, _>(idx)?),
        ColumnClass::Date | ColumnClass::DateTime | ColumnClass::Time
            if protocol == Protocol::Binary =>
        {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
            CellValue::Other(temporal_text(class, &bytes).map_err(sqlx::Error::Decode)?)
        }
        ColumnClass::Bytes => CellValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
        _ => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
            CellValue::Other(String::from_utf8_lossy(&bytes).into_owned())
        }
    };
    Ok(value)
}

/// Renders a binary-protocol DATE, DATETIME/TIMESTAMP or TIME value the way
/// MySQL prints it as text.
///
/// `bytes` is the packed value led by its length byte. Length 0 is the zero
/// value (`0000-00-00`, `00:00:00`). TIME keeps its sign and may exceed 24
/// hours (range `-838:59:59` to `838:59:59`).
pub(crate) fn temporal_text(
    class: ColumnClass,
    bytes: &[u8],
) -> Result<String, BoxDynError> {
    let payload = match bytes.split_first() {
        Some((&len, rest)) if rest.len() == len as usize => rest,
        None => &[][..],
        // already stripped of its length byte
        Some(_) if is_packed_len(class, bytes.len()) => bytes,
        _ => return Err(format!("malformed {:?} value: {:?}", class, bytes).into()),
    };

    match class {
        ColumnClass::Date | ColumnClass::DateTime => {
            let (year, month, day) = match payload.len() {
                0 => (0, 0, 0),
                n if n >= 4 => (u16::from_le_bytes([payload[0], payload[1]]), payload[2], payload[3]),
                _ => return Err(format!("malformed {:?} value: {:?}", class, bytes).into()),
            };
            let mut text = format!("{:04}-{:02}-{:02}", year, month, day);
            if class == ColumnClass::DateTime {
                text.push(' ');
                text.push_str(&clock_text(payload.get(4..).unwrap_or(&[]), bytes)?);
            }
            Ok(text)
        }
        ColumnClass::Time => {
            let (negative, days, clock) = match payload.len() {
                0 => (false, 0, &[][..]),
                n if n >= 8 => (
                    payload[0] == 1,
                    u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]),
                    &payload[5..],
                ),
                _ => return Err(format!("malformed TIME value: {:?}", bytes).into()),
            };
            let (hours, rest) = match clock.split_first() {
                Some((&h, rest)) => (days * 24 + u32::from(h), rest),
                None => (days * 24, clock),
            };
            let sign = if negative { "-" } else { "" };
            Ok(format!("{}{:02}:{}", sign, hours, minutes_seconds(rest, bytes)?))
        }
        _ => Err(format!("{:?} is not a temporal column", class).into()),
    }
}

fn is_packed_len(class: ColumnClass, len: usize) -> bool {
    match class {
        ColumnClass::Date | ColumnClass::DateTime => matches!(len, 4 | 7 | 11),
        ColumnClass::Time => matches!(len, 8 | 12),
        _ => false,
    }
}

/// `hh:mm:ss[.ffffff]` from `[h, m, s, micros(4 LE)?]`, all optional.
fn clock_text(clock: &[u8], whole: &[u8]) -> Result<String, BoxDynError> {
    match clock.split_first() {
        Some((&h, rest)) => Ok(format!("{:02}:{}", h, minutes_seconds(rest, whole)?)),
        None => Ok("00:00:00".to_string()),
    }
}

fn minutes_seconds(rest: &[u8], whole: &[u8]) -> Result<String, BoxDynError> {
    match rest {
        [] => Ok("00:00".to_string()),
        [m, s] => Ok(format!("{:02}:{:02}", m, s)),
        [m, s, f0, f1, f2, f3] => Ok(format!(
            "{:02}:{:02}.{:06}",
            m,
            s,
            u32::from_le_bytes([*f0, *f1, *f2, *f3])
        )),
        _ => Err(format!("malformed time-of-day: {:?}", whole).into()),
    }
}

fn unsigned_cell(value: u64) -> CellValue {
    match i64::try_from(value) {
        Ok(v) => CellValue::Integer(v),
        Err(_) => CellValue::Other(value.to_string()),
    }
}

fn decimal_cell(text: String) -> CellValue {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => CellValue::Float(v),
        _ => CellValue::Other(text),
    }
}
