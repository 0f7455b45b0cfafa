//! # dbwait-db
//!
//! Database readiness probing for dbwait:
//! - **postgres** — the PostgreSQL health check (`SELECT 1` over a fresh connection)
//!   and the mapping from driver errors to transient / fatal failures
//! - **waiter** — the retry loop that blocks until every target answers

pub mod postgres;
pub mod waiter;

pub use postgres::PgProbe;
pub use waiter::{HealthCheck, ReadinessWaiter, WaitReport};
