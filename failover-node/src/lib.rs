//! # failover-node
//!
//! Administrative control of a single MySQL node for master failover.
//!
//! A [`ConnectionManager`] keeps one administrative session to the node,
//! reconnecting transparently when the transport reports the session as
//! broken. A [`ReplicationController`] exposes the replication primitives a
//! failover orchestrator composes into a promotion: start/stop replication,
//! status queries, lock/unlock, read-only toggling, resets and GTID probing.
//!
//! The database driver is supplied by the caller through the [`Transport`]
//! and [`Session`] traits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use failover_node::{
//!     ConnectionManager, Credentials, NodeIdentity, ReplicationController, Transport,
//! };
//!
//! async fn demote<T: Transport>(transport: T) -> failover_node::NodeResult<()> {
//!     let identity = NodeIdentity::new(
//!         "10.0.0.5:3306",
//!         Credentials::new("root", "secret"),
//!         Credentials::new("repl", "repl-secret"),
//!     );
//!     let mut node = ReplicationController::new(ConnectionManager::new(identity, transport));
//!
//!     node.set_read_only(true).await?;
//!     let position = node.capture_cutover_position().await?;
//!     println!("cutover at {:?}", position.get_string_by_name(0, "Position"));
//!
//!     node.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod node;
pub mod replication;
pub mod transport;

pub use config::{FailoverConfig, LoggingConfig, NodeConfig, RetryConfig};
pub use connection::ConnectionManager;
pub use error::{NodeError, NodeResult};
pub use node::{Credentials, NodeIdentity};
pub use replication::{GtidMode, ReplicationController, SourcePosition};
pub use transport::{
    Ack, CommandResult, Param, ResultSet, Session, Transport, TransportError, TransportErrorKind,
    Value,
};
