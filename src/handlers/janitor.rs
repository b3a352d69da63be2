use std::time::Duration;

use actix::{Actor, AsyncContext, Context, Handler, Message, MessageResult};
use chrono::Utc;

use crate::{
    auth,
    db::{colonies, sessions, DbPool},
    error::ApiResult,
};

/// Counts of what a sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub codes: usize,
    pub sessions: usize,
    pub cached: usize,
}

#[derive(Message)]
#[rtype(result = "Option<SweepReport>")]
pub struct Sweep;

/// Periodically removes expired colony codes and sessions.
pub struct Janitor {
    pool: DbPool,
    interval: Duration,
    session_cache_max_age: Duration,
}

impl Janitor {
    pub fn new(pool: DbPool, interval: Duration, session_cache_max_age: Duration) -> Self {
        Self {
            pool,
            interval,
            session_cache_max_age,
        }
    }

    fn sweep(&self) -> ApiResult<SweepReport> {
        let now = Utc::now().naive_utc();

        let mut conn = self.pool.get()?;

        let codes = colonies::delete_expired_codes(&mut conn, now)?;
        let sessions = sessions::delete_expired_sessions(&mut conn, now)?;
        let cached = auth::prune_session_cache(self.session_cache_max_age);

        Ok(SweepReport {
            codes,
            sessions,
            cached,
        })
    }

    fn sweep_logged(&self) -> Option<SweepReport> {
        match self.sweep() {
            Ok(report) => {
                if report != SweepReport::default() {
                    log::info!(
                        "[Janitor] Removed {} expired codes, {} expired sessions, {} cached sessions",
                        report.codes,
                        report.sessions,
                        report.cached
                    );
                }

                Some(report)
            }

            Err(e) => {
                log::error!("[Janitor] Sweep failed: {}", e);

                None
            }
        }
    }
}

impl Actor for Janitor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        log::info!("[Janitor] Sweeping every {}s", self.interval.as_secs());

        ctx.run_interval(self.interval, |act, _ctx| {
            act.sweep_logged();
        });
    }
}

impl Handler<Sweep> for Janitor {
    type Result = MessageResult<Sweep>;

    fn handle(&mut self, _: Sweep, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.sweep_logged())
    }
}
