use actix::{Actor, Addr, Handler, Message, SyncContext};
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::{ExpressionMethods, PgConnection, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::config::AuthSettings;
use crate::errors::ServiceResult;
use crate::types::{
    DishCategory, PoolInitializationError, DEFAULT_EXPIRY_HOURS, DISH_CATEGORIES_PARAMETER, EXPIRY_PARAMETER,
};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

pub struct PgActor(pub PgPool);

pub struct AppState {
    pub pg_db: Addr<PgActor>,
    pub redis_db: redis::Client,
    pub auth: AuthSettings,
}

impl Actor for PgActor {
    type Context = SyncContext<Self>;
}

impl PgActor {
    pub fn connection(&self) -> ServiceResult<PooledConnection<ConnectionManager<PgConnection>>> {
        Ok(self.0.get()?)
    }
}

pub fn get_db_pool(db_url: &str, max_size: u32) -> Result<PgPool, PoolInitializationError> {
    let manager: ConnectionManager<PgConnection> = ConnectionManager::<PgConnection>::new(db_url);
    match Pool::builder().max_size(max_size).build(manager) {
        Ok(val) => Ok(val),
        Err(err) => Err(PoolInitializationError(err.to_string())),
    }
}

pub fn run_migrations(pool: &PgPool) -> Result<usize, PoolInitializationError> {
    let mut conn = pool.get().map_err(|err| PoolInitializationError(err.to_string()))?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| PoolInitializationError(err.to_string()))?;

    Ok(applied.len())
}

/// Inserts the default parameters unless an operator already set them.
pub fn seed_default_parameters(pool: &PgPool) -> ServiceResult<()> {
    use crate::schema::parameters::dsl::parameters;
    use crate::schema::parameters::{description, name, value};

    let categories: Vec<&str> = DishCategory::ALL.iter().map(|c| c.as_str()).collect();
    let defaults = [
        (
            EXPIRY_PARAMETER,
            DEFAULT_EXPIRY_HOURS.to_string(),
            "Hours before a pending reservation expires",
        ),
        (DISH_CATEGORIES_PARAMETER, categories.join(","), "Allowed dish categories"),
    ];

    let mut conn = pool.get()?;
    for (key, default_value, about) in defaults {
        diesel::insert_into(parameters)
            .values((name.eq(key), value.eq(default_value), description.eq(about)))
            .on_conflict(name)
            .do_nothing()
            .execute(&mut conn)?;
    }

    Ok(())
}

/// Sends `msg` to the database actors and flattens the mailbox error.
pub async fn dispatch<M, T>(pg_db: &Addr<PgActor>, msg: M) -> ServiceResult<T>
where
    M: Message<Result = ServiceResult<T>> + Send + 'static,
    T: Send + 'static,
    PgActor: Handler<M>,
{
    pg_db.send(msg).await?
}
