//! Replication control operations for one node
//!
//! Each operation is exactly one administrative command sent through the
//! [`ConnectionManager`]. Nothing here retries on its own: `RESET SLAVE`
//! and `RESET MASTER` are not safe to re-issue blindly.
//!
//! Callers composing a promotion must lock before reading a cutover
//! position and unlock on every exit path, and must redirect replicas
//! before stopping or resetting replication on a live source. These rules
//! are not enforced here; [`ReplicationController::capture_cutover_position`]
//! packages the lock/read/unlock sequence for the common case.

use crate::connection::ConnectionManager;
use crate::error::{NodeError, NodeResult};
use crate::node::NodeIdentity;
use crate::transport::{ResultSet, Transport};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

const START_SLAVE: &str = "START SLAVE";
const STOP_SLAVE: &str = "STOP SLAVE";
const STOP_SLAVE_IO_THREAD: &str = "STOP SLAVE IO_THREAD";
const SHOW_SLAVE_STATUS: &str = "SHOW SLAVE STATUS";
const SHOW_MASTER_STATUS: &str = "SHOW MASTER STATUS";
const RESET_SLAVE: &str = "RESET SLAVE";
const RESET_MASTER: &str = "RESET MASTER";
const SELECT_GTID_MODE: &str = "SELECT @@gtid_mode";
const SET_READ_ONLY_ON: &str = "SET GLOBAL read_only = ON";
const SET_READ_ONLY_OFF: &str = "SET GLOBAL read_only = OFF";
const FLUSH_TABLES_WITH_READ_LOCK: &str = "FLUSH TABLES WITH READ LOCK";
const UNLOCK_TABLES: &str = "UNLOCK TABLES";

/// Whether global transaction identifiers are in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GtidMode {
    On,
    #[default]
    Off,
}

impl GtidMode {
    /// Value of `@@gtid_mode` that means on
    pub const ON_SENTINEL: &'static str = "ON";

    /// `On` only for an exact match of the sentinel
    pub fn from_variable(value: &str) -> Self {
        if value == Self::ON_SENTINEL {
            GtidMode::On
        } else {
            GtidMode::Off
        }
    }

    pub fn is_on(self) -> bool {
        self == GtidMode::On
    }
}

impl fmt::Display for GtidMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GtidMode::On => f.write_str("ON"),
            GtidMode::Off => f.write_str("OFF"),
        }
    }
}

/// Where a replica resumes after being pointed at a new source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePosition {
    /// Let GTID auto-positioning pick the resume point
    Gtid,
    /// Explicit binary log coordinates
    Binlog { file: String, position: u64 },
}

/// Replication-control operations on one node
pub struct ReplicationController<T: Transport> {
    conn: ConnectionManager<T>,
}

impl<T: Transport> ReplicationController<T> {
    pub fn new(conn: ConnectionManager<T>) -> Self {
        Self { conn }
    }

    pub fn identity(&self) -> &NodeIdentity {
        self.conn.identity()
    }

    pub fn connection(&self) -> &ConnectionManager<T> {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut ConnectionManager<T> {
        &mut self.conn
    }

    pub fn into_connection(self) -> ConnectionManager<T> {
        self.conn
    }

    /// Release the administrative session
    pub async fn close(&mut self) {
        self.conn.close().await;
    }

    /// Begin applying from the configured source
    pub async fn start_replication(&mut self) -> NodeResult<()> {
        self.run(START_SLAVE).await
    }

    /// Halt both the receive and apply threads
    pub async fn stop_replication(&mut self) -> NodeResult<()> {
        self.run(STOP_SLAVE).await
    }

    /// Halt only the receive thread; the apply thread keeps draining its queue
    pub async fn stop_replication_receive_only(&mut self) -> NodeResult<()> {
        self.run(STOP_SLAVE_IO_THREAD).await
    }

    /// Replica-side position, lag and health rows
    pub async fn replication_status(&mut self) -> NodeResult<ResultSet> {
        self.query(SHOW_SLAVE_STATUS).await
    }

    /// This node's own binary log position as a source
    pub async fn source_status(&mut self) -> NodeResult<ResultSet> {
        self.query(SHOW_MASTER_STATUS).await
    }

    /// Clear replication configuration and position
    pub async fn reset_replication(&mut self) -> NodeResult<()> {
        self.run(RESET_SLAVE).await
    }

    /// Clear binary log and source state
    pub async fn reset_source_state(&mut self) -> NodeResult<()> {
        self.run(RESET_MASTER).await
    }

    /// Probe `@@gtid_mode`
    ///
    /// On failure the error is [`NodeError::ProbeFailed`] carrying
    /// [`GtidMode::Off`], so `unwrap_or_default()` degrades safely. A probe
    /// returning no cell counts as off.
    pub async fn gtid_mode(&mut self) -> NodeResult<GtidMode> {
        let result = match self.conn.execute(SELECT_GTID_MODE, &[]).await {
            Ok(result) => result,
            Err(err) => {
                warn!(node = %self.conn.identity(), "GTID mode probe failed: {}", err);
                return Err(NodeError::ProbeFailed {
                    fallback: GtidMode::Off,
                    source: Box::new(err),
                });
            }
        };

        let value = result.get_string(0, 0).unwrap_or_default();
        Ok(GtidMode::from_variable(&value))
    }

    /// Accept (`false`) or reject (`true`) writes
    pub async fn set_read_only(&mut self, read_only: bool) -> NodeResult<()> {
        let command = if read_only {
            SET_READ_ONLY_ON
        } else {
            SET_READ_ONLY_OFF
        };
        self.run(command).await
    }

    /// Freeze all tables against writes
    pub async fn lock_for_consistency(&mut self) -> NodeResult<()> {
        self.run(FLUSH_TABLES_WITH_READ_LOCK).await
    }

    pub async fn unlock_tables(&mut self) -> NodeResult<()> {
        self.run(UNLOCK_TABLES).await
    }

    /// Point this node at `source`, authenticating as the source's
    /// replication user
    pub async fn change_source_to(
        &mut self,
        source: &NodeIdentity,
        position: &SourcePosition,
    ) -> NodeResult<()> {
        let command = change_source_command(source, position)?;
        info!(
            node = %self.conn.identity(),
            source = %source,
            "Changing replication source"
        );
        // The statement embeds a password; logs and errors see only the label.
        self.conn
            .execute_labeled(&command, &[], "CHANGE MASTER TO")
            .await?;
        Ok(())
    }

    /// Lock tables, read the source position, and unlock
    ///
    /// The unlock is attempted whether or not the read succeeded. A read
    /// failure takes precedence over an unlock failure.
    pub async fn capture_cutover_position(&mut self) -> NodeResult<ResultSet> {
        self.lock_for_consistency().await?;

        let position = self.source_status().await;
        let unlocked = self.unlock_tables().await;

        match (position, unlocked) {
            (Ok(position), Ok(())) => Ok(position),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(unlock_err)) => {
                warn!(
                    node = %self.conn.identity(),
                    "Unlock after failed position read also failed: {}",
                    unlock_err
                );
                Err(err)
            }
        }
    }

    async fn run(&mut self, command: &str) -> NodeResult<()> {
        self.conn.execute(command, &[]).await?;
        Ok(())
    }

    async fn query(&mut self, command: &str) -> NodeResult<ResultSet> {
        let result = self.conn.execute(command, &[]).await?;
        Ok(result.into_result_set())
    }
}

/// Render `CHANGE MASTER TO` for `source` and `position`
pub(crate) fn change_source_command(
    source: &NodeIdentity,
    position: &SourcePosition,
) -> NodeResult<String> {
    let port = source
        .port_number()
        .filter(|_| !source.host().is_empty())
        .ok_or_else(|| NodeError::InvalidAddress(source.address().to_string()))?;
    let user = source.replication_user();

    let mut command = format!(
        "CHANGE MASTER TO MASTER_HOST={}, MASTER_PORT={}, MASTER_USER={}, MASTER_PASSWORD={}",
        quote_literal(source.host()),
        port,
        quote_literal(&user.name),
        quote_literal(&user.password),
    );

    match position {
        SourcePosition::Gtid => command.push_str(", MASTER_AUTO_POSITION=1"),
        SourcePosition::Binlog { file, position } => {
            command.push_str(&format!(
                ", MASTER_LOG_FILE={}, MASTER_LOG_POS={}",
                quote_literal(file),
                position
            ));
        }
    }

    Ok(command)
}

/// Single-quoted SQL string literal
///
/// Quotes are doubled, which every `sql_mode` accepts. Backslashes are
/// doubled too, which assumes the server does not run with
/// `NO_BACKSLASH_ESCAPES`; other characters pass through as-is.
fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => quoted.push_str("''"),
            '\\' => quoted.push_str("\\\\"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('\'');
    quoted
}
