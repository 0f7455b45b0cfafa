//! PostgreSQL health check.
//!
//! Each probe opens a fresh connection, runs `SELECT 1` and closes it again.
//! No pool is kept: the point is to find out whether a *new* client can get
//! in, which is what the application will try right after we exit.

use std::collections::HashMap;
use std::io;
use std::str::FromStr;
use std::time::Duration;

use dbwait_common::config::AppConfig;
use dbwait_common::error::{ProbeError, ProbeResult};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection};

use crate::waiter::HealthCheck;

/// Health check over one or more PostgreSQL databases, keyed by alias.
#[derive(Debug, Clone)]
pub struct PgProbe {
    targets: HashMap<String, PgConnectOptions>,
    timeout: Duration,
}

impl PgProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            targets: HashMap::new(),
            timeout,
        }
    }

    /// Build a probe for every database in `config`.
    ///
    /// A URL that does not parse is fatal: no amount of waiting will fix it.
    pub fn from_config(config: &AppConfig) -> ProbeResult<Self> {
        let mut probe = Self::new(config.wait.probe_timeout());
        for (alias, db) in &config.databases {
            probe.add(alias, &db.url)?;
        }
        Ok(probe)
    }

    /// Register `url` under `alias`.
    pub fn add(&mut self, alias: &str, url: &str) -> ProbeResult {
        let options = PgConnectOptions::from_str(url)
            .map_err(|source| ProbeError::Fatal {
                target: alias.to_string(),
                source,
            })?
            // Probe failures are reported by the waiter, not per statement.
            .disable_statement_logging();
        self.targets.insert(alias.to_string(), options);
        Ok(())
    }

    /// Connect to `alias`, run `SELECT 1`, disconnect.
    pub async fn probe(&self, alias: &str) -> ProbeResult {
        let options = self
            .targets
            .get(alias)
            .ok_or_else(|| ProbeError::UnknownTarget {
                target: alias.to_string(),
            })?;

        let connect = PgConnection::connect_with(options);
        let mut conn = match tokio::time::timeout(self.timeout, connect).await {
            Ok(connected) => connected.map_err(|e| classify(alias, e))?,
            Err(_) => return Err(self.timed_out(alias, "no connection")),
        };

        // A server can finish the handshake and still stall on the first query.
        let query = sqlx::query("SELECT 1").execute(&mut conn);
        let outcome = match tokio::time::timeout(self.timeout, query).await {
            Ok(executed) => executed.map(|_| ()).map_err(|e| classify(alias, e)),
            Err(_) => return Err(self.timed_out(alias, "no answer to SELECT 1")),
        };

        if let Err(e) = conn.close().await {
            tracing::debug!(database = alias, "Error closing probe connection: {e}");
        }

        outcome
    }

    fn timed_out(&self, alias: &str, what: &str) -> ProbeError {
        ProbeError::Connection {
            target: alias.to_string(),
            source: sqlx::Error::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{what} within {:?}", self.timeout),
            )),
        }
    }
}

impl HealthCheck for PgProbe {
    async fn check(&self, targets: &[String]) -> ProbeResult {
        for alias in targets {
            self.probe(alias).await?;
            tracing::debug!(database = %alias, "Database answered");
        }
        Ok(())
    }
}

/// Sort a driver error into connection (transient), operational (transient)
/// or fatal.
pub fn classify(alias: &str, error: sqlx::Error) -> ProbeError {
    let target = alias.to_string();
    if is_connection_error(&error) {
        ProbeError::Connection {
            target,
            source: error,
        }
    } else if is_operational_error(&error) {
        ProbeError::Operational {
            target,
            source: error,
        }
    } else {
        ProbeError::Fatal {
            target,
            source: error,
        }
    }
}

fn is_connection_error(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Io(_) | sqlx::Error::Tls(_))
}

fn is_operational_error(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| is_transient_sqlstate(&code)),
        _ => false,
    }
}

/// SQLSTATE classes a server reports while it (or the database inside it) is
/// still coming up:
/// - `08` connection exception
/// - `28` invalid authorization (role not created yet)
/// - `3D` invalid catalog name (database not created yet)
/// - `53` insufficient resources (e.g. too many connections)
/// - `57` operator intervention (e.g. `57P03` cannot_connect_now)
pub fn is_transient_sqlstate(code: &str) -> bool {
    matches!(code.get(..2), Some("08" | "28" | "3D" | "53" | "57"))
}
