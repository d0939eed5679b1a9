use std::time::Duration;

use futures::FutureExt;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

/// Connection pool sizing by deployment environment (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbEnvironment {
    Prod,
    Dev,
    Test,
}

impl DbEnvironment {
    fn profile(self) -> PoolProfile {
        match self {
            Self::Prod => PoolProfile {
                max_connections: 20,
                min_connections: 5,
                idle_timeout: Duration::from_secs(20),
                max_lifetime: Duration::from_secs(30 * 60),
            },
            Self::Dev => PoolProfile {
                max_connections: 10,
                min_connections: 2,
                idle_timeout: Duration::from_secs(20),
                max_lifetime: Duration::from_secs(30 * 60),
            },
            Self::Test => PoolProfile {
                max_connections: 5,
                min_connections: 1,
                idle_timeout: Duration::from_secs(20),
                max_lifetime: Duration::from_secs(30 * 60),
            },
        }
    }
}

struct PoolProfile {
    max_connections: u32,
    min_connections: u32,
    idle_timeout: Duration,
    max_lifetime: Duration,
}

/// Builds the pool for `environment`, following `agent/src/main.rs`'s
/// `PgPoolOptions` builder: a ping-based `after_release` health check evicts
/// connections a client left in a bad state rather than handing them back
/// out, and a background task logs pool occupancy every 120s.
pub async fn connect(connection_string: &str, environment: DbEnvironment, application_name: &str) -> anyhow::Result<PgPool> {
    let profile = environment.profile();

    let mut options: PgConnectOptions = connection_string
        .parse()
        .map_err(|e| anyhow::anyhow!("parsing postgres connection string: {e}"))?;
    options = options
        .application_name(application_name)
        // TCP keepalive ~600s (spec.md §4.3) so a connection sitting idle
        // behind a NAT/load balancer doesn't get silently dropped.
        .options([("keepalives", "1"), ("keepalives_idle", "600")]);

    let pool = PgPoolOptions::new()
        .max_connections(profile.max_connections)
        .min_connections(profile.min_connections)
        .idle_timeout(profile.idle_timeout)
        .max_lifetime(profile.max_lifetime)
        .acquire_timeout(Duration::from_secs(10))
        .after_release(|conn, meta| {
            let fut = async move {
                let r = tokio::time::timeout(Duration::from_secs(5), sqlx::Executor::execute(conn, "select 1")).await;
                if let Err(err) = r {
                    tracing::warn!(error = ?err, conn_meta = ?meta, "connection failed health check on release, evicting");
                    Ok(false)
                } else {
                    Ok(true)
                }
            };
            fut.boxed()
        })
        .connect_with(options)
        .await?;

    spawn_pool_stats_logger(pool.clone());
    Ok(pool)
}

fn spawn_pool_stats_logger(pool: PgPool) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(120));
        loop {
            interval.tick().await;
            tracing::info!(
                total_connections = pool.size(),
                idle_connections = pool.num_idle(),
                "db connection pool stats"
            );
        }
    });
}

/// Applies the crate's bundled migrations. Called once at boot (indexer-core
/// component J) before cache hydration.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
