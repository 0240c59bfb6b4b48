//! Periodic expiry of stale pending reservations.

use std::time::Duration;

use actix::{Actor, Addr, AsyncContext, Context};
use chrono::Utc;

use crate::services::db_utils::{dispatch, PgActor};
use crate::services::messages::ExpireStaleReservations;

pub struct ExpirationSweeper {
    pg_db: Addr<PgActor>,
    interval: Duration,
}

impl ExpirationSweeper {
    pub fn new(pg_db: Addr<PgActor>, interval_secs: u64) -> Self {
        ExpirationSweeper { pg_db, interval: Duration::from_secs(interval_secs.max(1)) }
    }

    fn sweep(&self) {
        let pg_db = self.pg_db.clone();

        actix::spawn(async move {
            match dispatch(&pg_db, ExpireStaleReservations { now: Utc::now() }).await {
                Ok(expired) if expired.is_empty() => tracing::debug!("no stale reservations"),
                Ok(expired) => tracing::info!(count = expired.len(), "expired stale reservations"),
                Err(err) => tracing::error!(error = %err, "reservation sweep failed"),
            }
        });
    }
}

impl Actor for ExpirationSweeper {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(interval_secs = self.interval.as_secs(), "expiration sweeper started");
        self.sweep();
        ctx.run_interval(self.interval, |sweeper, _ctx| sweeper.sweep());
    }
}
