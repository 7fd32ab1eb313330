//! Transport abstraction consumed by the connection manager
//!
//! A transport knows how to open an administrative session to a database
//! node and how to run one statement on it. Drivers implement [`Transport`]
//! and [`Session`]; this crate never builds wire packets itself.

use crate::error::{NodeError, NodeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The session is no longer usable and must be replaced
    BrokenConnection,
    /// Anything else: refused connection, bad credentials, SQL errors
    Other,
}

/// Error reported by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Session-level breakage, e.g. "server has gone away"
    pub fn broken_connection(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::BrokenConnection, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the connection manager may discard the session and retry
    pub fn is_connection_broken(&self) -> bool {
        self.kind == TransportErrorKind::BrokenConnection
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TransportErrorKind::BrokenConnection => {
                write!(f, "broken connection: {}", self.message)
            }
            TransportErrorKind::Other => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for TransportError {}

/// Positional statement parameter, substituted by the transport
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Text(String),
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Int(value)
    }
}

impl From<u64> for Param {
    fn from(value: u64) -> Self {
        Param::UInt(value)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Bool(value)
    }
}

/// A single result cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Double(f64),
    Text(String),
}

impl Value {
    /// String rendering of the cell; NULL renders as an empty string
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(v) => v.to_string(),
            Value::UInt(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Text(v) => v.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Tabular result of an introspection query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column, compared case-insensitively like MySQL does
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    pub fn value(&self, row: usize, column: usize) -> NodeResult<&Value> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .ok_or(NodeError::CellNotFound { row, column })
    }

    /// Cell at (row, column) rendered as a string
    pub fn get_string(&self, row: usize, column: usize) -> NodeResult<String> {
        self.value(row, column).map(Value::to_text)
    }

    pub fn get_string_by_name(&self, row: usize, name: &str) -> NodeResult<String> {
        let column = self
            .column_index(name)
            .ok_or_else(|| NodeError::ColumnNotFound(name.to_string()))?;
        self.get_string(row, column)
    }
}

/// Acknowledgement of a statement that returns no rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub warnings: u16,
}

/// Outcome of one administrative command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandResult {
    Ack(Ack),
    Rows(ResultSet),
}

impl CommandResult {
    pub fn result_set(&self) -> Option<&ResultSet> {
        match self {
            CommandResult::Rows(rows) => Some(rows),
            CommandResult::Ack(_) => None,
        }
    }

    /// Rows of the result; an acknowledgement becomes an empty set
    pub fn into_result_set(self) -> ResultSet {
        match self {
            CommandResult::Rows(rows) => rows,
            CommandResult::Ack(_) => ResultSet::default(),
        }
    }

    /// Cell accessor used by single-value probes
    pub fn get_string(&self, row: usize, column: usize) -> NodeResult<String> {
        match self {
            CommandResult::Rows(rows) => rows.get_string(row, column),
            CommandResult::Ack(_) => Err(NodeError::CellNotFound { row, column }),
        }
    }
}

/// Connector able to open administrative sessions
#[async_trait]
pub trait Transport: Send + Sync {
    type Session: Session;

    /// Open a session to `address` with the given credentials.
    /// An empty `catalog` means the server default.
    async fn connect(
        &self,
        address: &str,
        user: &str,
        password: &str,
        catalog: &str,
    ) -> Result<Self::Session, TransportError>;
}

/// A live administrative session
///
/// Implementations release the underlying connection when dropped, so a
/// session is freed even when [`Session::close`] is never reached.
#[async_trait]
pub trait Session: Send {
    async fn execute(
        &mut self,
        command: &str,
        params: &[Param],
    ) -> Result<CommandResult, TransportError>;

    /// Gracefully close the session
    async fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slave_status() -> ResultSet {
        ResultSet::new(
            vec![
                "Slave_IO_Running".to_string(),
                "Seconds_Behind_Master".to_string(),
                "Last_Error".to_string(),
            ],
            vec![vec![
                Value::Text("Yes".to_string()),
                Value::UInt(0),
                Value::Null,
            ]],
        )
    }

    #[test]
    fn test_get_string_by_position() {
        let rs = slave_status();
        assert_eq!(rs.get_string(0, 0).unwrap(), "Yes");
        assert_eq!(rs.get_string(0, 1).unwrap(), "0");
        assert_eq!(rs.get_string(0, 2).unwrap(), "");
    }

    #[test]
    fn test_get_string_out_of_range() {
        let rs = slave_status();
        assert!(matches!(
            rs.get_string(1, 0),
            Err(NodeError::CellNotFound { row: 1, column: 0 })
        ));
        assert!(rs.get_string(0, 3).is_err());
    }

    #[test]
    fn test_get_string_by_name_ignores_case() {
        let rs = slave_status();
        assert_eq!(
            rs.get_string_by_name(0, "seconds_behind_master").unwrap(),
            "0"
        );
        assert!(matches!(
            rs.get_string_by_name(0, "Relay_Log_File"),
            Err(NodeError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_ack_has_no_cells() {
        let result = CommandResult::Ack(Ack::default());
        assert!(result.result_set().is_none());
        assert!(result.get_string(0, 0).is_err());
        assert!(result.into_result_set().is_empty());
    }

    #[test]
    fn test_transport_error_classification() {
        let broken = TransportError::broken_connection("server has gone away");
        assert!(broken.is_connection_broken());
        assert_eq!(broken.to_string(), "broken connection: server has gone away");

        let denied = TransportError::other("Access denied for user 'root'");
        assert!(!denied.is_connection_broken());
        assert_eq!(denied.kind(), TransportErrorKind::Other);
    }

    #[test]
    fn test_result_set_serializes_cells_untagged() {
        let json = serde_json::to_value(slave_status()).unwrap();
        assert_eq!(json["rows"][0][0], "Yes");
        assert_eq!(json["rows"][0][1], 0);
        assert!(json["rows"][0][2].is_null());
    }
}
