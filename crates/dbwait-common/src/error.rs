//! Centralized error types for dbwait.
//!
//! A probe failure is either *transient* (the database is not ready yet, try
//! again later) or *fatal* (retrying cannot help, abort startup). Only the
//! two transient kinds are ever retried by the waiter.

/// Failure of a single health-check attempt against one database alias.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The driver could not reach the server (refused, reset, TLS, timeout).
    #[error("cannot connect to database `{target}`: {source}")]
    Connection {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// The server is reachable but not accepting work yet (starting up,
    /// shutting down, out of connection slots, database not created yet).
    #[error("database `{target}` is not ready: {source}")]
    Operational {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("no connection URL configured for database `{target}`")]
    UnknownTarget { target: String },

    #[error("health check of database `{target}` failed: {source}")]
    Fatal {
        target: String,
        #[source]
        source: sqlx::Error,
    },
}

impl ProbeError {
    /// Whether the waiter should sleep and retry instead of giving up.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Operational { .. })
    }

    /// The database alias this failure belongs to.
    pub fn target(&self) -> &str {
        match self {
            Self::Connection { target, .. }
            | Self::Operational { target, .. }
            | Self::UnknownTarget { target }
            | Self::Fatal { target, .. } => target,
        }
    }

    /// Short machine-friendly name of the failure kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Operational { .. } => "operational",
            Self::UnknownTarget { .. } => "unknown_target",
            Self::Fatal { .. } => "fatal",
        }
    }
}

/// Reasons the readiness loop stops without the database becoming available.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("no databases to wait for")]
    NoTargets,

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Convenience type alias for the outcome of one probe attempt.
pub type ProbeResult<T = ()> = Result<T, ProbeError>;
