use std::io;

use actix::{Actor, Addr, SyncArbiter};
use actix_cors::Cors;
use actix_web::web::Data;
use actix_web::{middleware, App, HttpServer};
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

use canteen_back::config::Settings;
use canteen_back::services;
use canteen_back::services::db_utils::{get_db_pool, run_migrations, seed_default_parameters, AppState, PgActor};
use canteen_back::services::sweeper::ExpirationSweeper;

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn init_pg_db(settings: &Settings) -> io::Result<Addr<PgActor>> {
    let pool = get_db_pool(&settings.pg.url, settings.pg.max_connections).map_err(io::Error::other)?;

    let applied = run_migrations(&pool).map_err(io::Error::other)?;
    tracing::info!(applied, "database migrations up to date");
    seed_default_parameters(&pool).map_err(io::Error::other)?;

    Ok(SyncArbiter::start(settings.server.workers_pg, move || PgActor(pool.clone())))
}

fn init_redis_db(settings: &Settings) -> io::Result<redis::Client> {
    redis::Client::open(settings.redis.url.as_str()).map_err(io::Error::other)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    let settings = Settings::load().map_err(io::Error::other)?;
    init_tracing(&settings.log.filter);

    let (host, port) = settings.bind_address();
    tracing::info!(
        %host,
        port,
        workers_pg = settings.server.workers_pg,
        sweep_every_secs = settings.sweeper.interval_secs,
        "starting canteen service"
    );

    let pg_db = init_pg_db(&settings)?;
    let redis_db = init_redis_db(&settings)?;
    ExpirationSweeper::new(pg_db.clone(), settings.sweeper.interval_secs).start();

    let state = Data::new(AppState { pg_db, redis_db, auth: settings.auth.clone() });

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(services::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
