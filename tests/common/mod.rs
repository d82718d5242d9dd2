//! Common test utilities for all integration tests.
//!
//! Provides an in-memory secret store that records every request and a
//! connector whose outcomes are scripted per attempt.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use async_trait::async_trait;
use credpool::config::ConnectionConfig;
use credpool::secrets::{SecretRequest, SecretStore, SecretStoreType, SecretsError};
use credpool::storage::{ConnectError, ConnectErrorKind, Connector};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Credential document in the shape secret stores return.
pub fn payload(host: &str, password: &str) -> Value {
    json!({
        "host": host,
        "port": 5432,
        "dbname": "app",
        "username": "u",
        "password": password,
    })
}

/// Static configuration pointing at `secret_ref`.
pub fn secret_config(secret_ref: &str) -> ConnectionConfig {
    ConnectionConfig {
        host: "config-host".to_string(),
        database: "config-db".to_string(),
        username: "config-user".to_string(),
        password: "config-password".into(),
        secret_ref: Some(secret_ref.to_string()),
        ..Default::default()
    }
}

/// Static configuration without a secret.
pub fn static_config() -> ConnectionConfig {
    ConnectionConfig { secret_ref: None, ..secret_config("") }
}

/// Secret store answering from a queue of scripted responses.
///
/// Once the queue is empty every fetch is `NotFound`.
#[derive(Debug, Default)]
pub struct RecordingStore {
    responses: Mutex<VecDeque<Result<Value, SecretsError>>>,
    requests: Mutex<Vec<SecretRequest>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(responses: impl IntoIterator<Item = Value>) -> Self {
        let store = Self::new();
        for response in responses {
            store.push_ok(response);
        }
        store
    }

    pub fn push_ok(&self, value: Value) {
        self.responses.lock().unwrap().push_back(Ok(value));
    }

    pub fn push_err(&self, error: SecretsError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<SecretRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecretStore for RecordingStore {
    async fn fetch_secret(&self, request: &SecretRequest) -> Result<Value, SecretsError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SecretsError::not_found(&request.secret_id)))
    }

    fn store_type(&self) -> SecretStoreType {
        SecretStoreType::Env
    }
}

/// What a scripted attempt does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Connect,
    FailConnect(ConnectErrorKind),
    /// Connects, then fails the version check
    FailVersion,
}

/// The "connection" handed out by [`ScriptedConnector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestConnection {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

/// Connector whose attempts follow a script; unscripted attempts connect.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    script: Mutex<VecDeque<Outcome>>,
    pending_version_failure: Mutex<bool>,
    attempts: Mutex<Vec<ConnectionConfig>>,
}

impl ScriptedConnector {
    pub fn new(script: impl IntoIterator<Item = Outcome>) -> Self {
        Self { script: Mutex::new(script.into_iter().collect()), ..Default::default() }
    }

    pub fn always_connect() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> Vec<ConnectionConfig> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn attempted_passwords(&self) -> Vec<String> {
        self.attempts().iter().map(|c| c.password.expose_secret().to_string()).collect()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Connection = TestConnection;

    async fn connect(&self, config: &ConnectionConfig) -> Result<TestConnection, ConnectError> {
        self.attempts.lock().unwrap().push(config.clone());
        let outcome = self.script.lock().unwrap().pop_front().unwrap_or(Outcome::Connect);

        match outcome {
            Outcome::FailConnect(kind) => Err(ConnectError::new(
                kind,
                format!("scripted failure for {}", config.display_target()),
            )),
            Outcome::Connect | Outcome::FailVersion => {
                *self.pending_version_failure.lock().unwrap() = outcome == Outcome::FailVersion;
                Ok(TestConnection {
                    host: config.host.clone(),
                    port: config.port,
                    database: config.database.clone(),
                    username: config.username.clone(),
                    password: config.password.expose_secret().to_string(),
                })
            }
        }
    }

    async fn check_version(&self, _connection: &mut TestConnection) -> Result<(), ConnectError> {
        let fail = std::mem::take(&mut *self.pending_version_failure.lock().unwrap());
        if fail {
            Err(ConnectError::new(ConnectErrorKind::UnsupportedVersion, "server version 90200 is too old"))
        } else {
            Ok(())
        }
    }
}
