//! Common test utilities

use async_trait::async_trait;
use failover_node::{
    Ack, CommandResult, ConnectionManager, Credentials, NodeIdentity, Param, ReplicationController,
    ResultSet, RetryConfig, Session, Transport, TransportError, Value,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// A call observed by the scripted transport
#[allow(dead_code)] // Fields are read by pattern in some test modules only
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect {
        address: String,
        user: String,
        password: String,
        catalog: String,
    },
    Execute {
        session: u64,
        command: String,
        params: Vec<Param>,
    },
    Close {
        session: u64,
    },
}

#[derive(Default)]
struct Script {
    connect_results: VecDeque<Result<(), TransportError>>,
    execute_results: VecDeque<Result<CommandResult, TransportError>>,
    responses: HashMap<String, CommandResult>,
    hang_next_execute: bool,
    calls: Vec<Call>,
    next_session: u64,
}

/// In-memory transport that replays queued outcomes and records every call
///
/// Queued connect/execute outcomes are consumed in order; once a queue is
/// empty, connects succeed and commands return the canned response for the
/// command text, or a bare acknowledgement. Addresses without a port
/// separator are refused, like a real driver would.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

#[allow(dead_code)] // Used by other test modules
impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_connect(&self, result: Result<(), TransportError>) -> &Self {
        self.script.lock().unwrap().connect_results.push_back(result);
        self
    }

    pub fn push_execute(&self, result: Result<CommandResult, TransportError>) -> &Self {
        self.script.lock().unwrap().execute_results.push_back(result);
        self
    }

    pub fn push_broken(&self, times: usize) -> &Self {
        for _ in 0..times {
            self.push_execute(Err(TransportError::broken_connection(
                "MySQL server has gone away",
            )));
        }
        self
    }

    /// Make the next execute never complete
    pub fn hang_next_execute(&self) -> &Self {
        self.script.lock().unwrap().hang_next_execute = true;
        self
    }

    /// Canned response for a command once the execute queue is drained
    pub fn respond(&self, command: &str, result: CommandResult) -> &Self {
        self.script
            .lock()
            .unwrap()
            .responses
            .insert(command.to_string(), result);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Connect { .. }))
            .count()
    }

    pub fn execute_count(&self) -> usize {
        self.executed_commands().len()
    }

    pub fn executed_commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Execute { command, .. } => Some(command),
                _ => None,
            })
            .collect()
    }

    pub fn closed_sessions(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Close { session } => Some(session),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Session = ScriptedSession;

    async fn connect(
        &self,
        address: &str,
        user: &str,
        password: &str,
        catalog: &str,
    ) -> Result<Self::Session, TransportError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::Connect {
            address: address.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            catalog: catalog.to_string(),
        });

        if !address.contains(':') {
            return Err(TransportError::other(format!(
                "dial tcp {}: missing port in address",
                address
            )));
        }
        if let Some(Err(err)) = script.connect_results.pop_front() {
            return Err(err);
        }

        script.next_session += 1;
        Ok(ScriptedSession {
            id: script.next_session,
            script: Arc::clone(&self.script),
        })
    }
}

/// Session handed out by [`ScriptedTransport`]; ids start at 1
pub struct ScriptedSession {
    id: u64,
    script: Arc<Mutex<Script>>,
}

#[allow(dead_code)] // Used by other test modules
impl ScriptedSession {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn execute(
        &mut self,
        command: &str,
        params: &[Param],
    ) -> Result<CommandResult, TransportError> {
        let hang = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::Execute {
                session: self.id,
                command: command.to_string(),
                params: params.to_vec(),
            });
            std::mem::take(&mut script.hang_next_execute)
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let mut script = self.script.lock().unwrap();
        if let Some(result) = script.execute_results.pop_front() {
            return result;
        }
        Ok(script
            .responses
            .get(command)
            .cloned()
            .unwrap_or(CommandResult::Ack(Ack::default())))
    }

    async fn close(&mut self) {
        self.script
            .lock()
            .unwrap()
            .calls
            .push(Call::Close { session: self.id });
    }
}

/// Identity of the node under test
#[allow(dead_code)] // Used by other test modules
pub fn test_identity(address: &str) -> NodeIdentity {
    NodeIdentity::new(
        address,
        Credentials::new("root", "secret"),
        Credentials::new("repl", "repl-secret"),
    )
}

/// Connection manager with the default retry policy over a fresh transport
#[allow(dead_code)] // Used by other test modules
pub fn setup_manager() -> (ConnectionManager<ScriptedTransport>, ScriptedTransport) {
    let transport = ScriptedTransport::new();
    let manager = ConnectionManager::with_retry(
        test_identity("10.0.0.5:3306"),
        transport.clone(),
        RetryConfig::default(),
    );
    (manager, transport)
}

/// Replication controller over a fresh transport
#[allow(dead_code)] // Used by other test modules
pub fn setup_controller() -> (ReplicationController<ScriptedTransport>, ScriptedTransport) {
    let (manager, transport) = setup_manager();
    (ReplicationController::new(manager), transport)
}

/// Single-row result set
#[allow(dead_code)] // Used by other test modules
pub fn single_row(columns: &[&str], values: Vec<Value>) -> CommandResult {
    CommandResult::Rows(ResultSet::new(
        columns.iter().map(|c| c.to_string()).collect(),
        vec![values],
    ))
}
