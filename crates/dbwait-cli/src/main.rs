//! # wait_for_db
//!
//! Startup-ordering helper: run it before the application in a container
//! entrypoint and it returns once every configured database accepts
//! connections. Exit code 0 means ready; anything else means a fatal error
//! (bad configuration, unknown alias, or a failure retrying cannot fix).

use clap::Parser;
use dbwait_common::config::{AppConfig, DEFAULT_TARGET};
use dbwait_db::{PgProbe, ReadinessWaiter};

#[derive(Debug, Parser)]
#[command(name = "wait_for_db", version, about = "Block until the database accepts connections")]
struct Cli {
    /// Connection URL for the `default` database.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Database alias to wait for (repeatable). Defaults to `default`.
    #[arg(long = "target", value_name = "ALIAS")]
    targets: Vec<String>,

    /// Seconds to sleep between failed attempts.
    #[arg(long, value_name = "SECS")]
    interval_secs: Option<u64>,

    /// Emit JSON log lines instead of plain text.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Layer command-line values over the loaded configuration.
    fn apply(self, config: &mut AppConfig) {
        if let Some(url) = self.database_url {
            config.set_url(DEFAULT_TARGET, url);
        }
        if !self.targets.is_empty() {
            config.wait.targets = self.targets;
        }
        if let Some(secs) = self.interval_secs {
            config.wait.interval_secs = secs;
        }
        if self.json_logs {
            config.log.json = true;
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dbwait_db=info,dbwait_common=info,wait_for_db=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = dbwait_common::config::init()?;
    cli.apply(&mut config);
    config.validate()?;

    init_tracing(config.log.json);

    let probe = PgProbe::from_config(&config)?;
    let waiter = ReadinessWaiter::new(config.wait.interval());
    let report = waiter.wait(&probe, &config.wait.targets).await?;

    tracing::debug!(
        attempts = report.attempts,
        sleeps = report.sleeps,
        "Readiness wait finished"
    );
    Ok(())
}
