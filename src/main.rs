use std::{env, time::Duration};

use actix::{Actor, Arbiter};
use actix_web::{middleware, web, App, HttpServer};
use anyhow::{anyhow, Context};

use colony_backend::{
    config::{masked_database_url, Config, RuntimeMode},
    db,
    handlers::{self, janitor::Janitor, AppState},
    logging,
    multiplayer::Lobbies,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let mode = RuntimeMode::from_args(env::args().skip(1));

    let config = Config::load(mode).context("invalid configuration")?;

    let _logger = logging::init_logging(&config.log_level).context("failed to start logger")?;

    log::info!(
        "[Server] Starting in {:?} mode against {}",
        mode,
        masked_database_url(&config.database_url)
    );

    let pool = db::connect(&config).context("failed to connect to the database")?;

    if config.run_migrations {
        let mut conn = pool.get().context("failed to get a connection for migrations")?;

        db::run_migrations(&mut conn).map_err(|e| anyhow!("failed to run migrations: {}", e))?;
    }

    let lobbies = Lobbies::from_config(&config).context("failed to build lobby client")?;

    let janitor_pool = pool.clone();
    let janitor_interval = Duration::from_secs(config.janitor_interval_secs);
    let session_cache_max_age = Duration::from_secs(config.session_cache_secs);

    Janitor::start_in_arbiter(&Arbiter::new().handle(), move |_| {
        Janitor::new(janitor_pool, janitor_interval, session_cache_max_age)
    });

    let bind_address = config.bind_address();

    let state = web::Data::new(AppState::new(pool, config, lobbies));

    log::info!("[Server] Listening on {}:{}", bind_address.0, bind_address.1);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind(bind_address)?
    .run()
    .await?;

    Ok(())
}
