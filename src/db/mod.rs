use std::{thread, time::Duration};

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, Pool, PoolError},
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::config::{masked_database_url, Config};

pub mod assets;
pub mod collections;
pub mod colonies;
pub mod minigames;
pub mod models;
pub mod players;
pub mod schema;
pub mod sessions;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(2);

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Builds the connection pool, retrying until the database accepts a
/// connection or `db_max_timeout` attempts have been made.
pub fn connect(config: &Config) -> Result<DbPool, PoolError> {
    let masked = masked_database_url(&config.database_url);

    let mut attempt = 1;

    loop {
        log::info!(
            "[database] Connecting to {} (attempt {}/{})",
            masked,
            attempt,
            config.db_max_timeout
        );

        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        match Pool::builder()
            .max_size(config.db_max_connections)
            .build(manager)
        {
            Ok(pool) => {
                log::info!("[database] Connected to {}", masked);

                return Ok(pool);
            }

            Err(e) if attempt < config.db_max_timeout => {
                log::warn!("[database] Connection failed: {}", e);

                attempt += 1;

                thread::sleep(CONNECT_RETRY_INTERVAL);
            }

            Err(e) => {
                log::error!(
                    "[database] Giving up on {} after {} attempts: {}",
                    masked,
                    attempt,
                    e
                );

                return Err(e);
            }
        }
    }
}

/// Pool that never opens a connection until one is requested. Used where
/// a pool must exist but the database may be absent.
pub fn lazy_pool(database_url: &str, timeout: Duration) -> DbPool {
    Pool::builder()
        .max_size(1)
        .connection_timeout(timeout)
        .build_unchecked(ConnectionManager::<PgConnection>::new(database_url))
}

pub fn run_migrations(
    conn: &mut PgConnection,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync + 'static>> {
    let applied = conn.run_pending_migrations(MIGRATIONS)?;

    for migration in applied.iter() {
        log::info!("[database] Applied migration {}", migration);
    }

    log::info!("[database] Migrations completed ({} applied)", applied.len());

    Ok(applied.len())
}
