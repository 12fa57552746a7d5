//! Background sweep: expires stale bottles out of `main` and reclaims stale
//! holds. The loop is a cancellable task; `sweep_once` is the deterministic
//! single pass the loop (and tests) drive.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use adrift_db::{Database, queries};

use crate::bottles::run_tx;
use crate::error::CoreResult;
use crate::{memorial, now_ts};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired empty bottles deleted outright.
    pub deleted: usize,
    /// Expired bottles with replies finalized into memorials.
    pub memorialized: usize,
    /// Stale holds reclaimed, their bottles returned to `main`.
    pub holds_released: usize,
}

impl SweepReport {
    pub fn is_noop(&self) -> bool {
        self.deleted == 0 && self.memorialized == 0 && self.holds_released == 0
    }
}

/// One full sweep at the current time.
pub fn sweep_once(db: &Database) -> CoreResult<SweepReport> {
    sweep_at(db, now_ts())
}

/// Both passes, each one transaction, so live request mutations on the same
/// rows serialize against the sweep instead of interleaving with it.
pub fn sweep_at(db: &Database, now: i64) -> CoreResult<SweepReport> {
    let mut report = SweepReport::default();

    // Pass 1: expired bottles still in `main`. Empty ones are deleted — the
    // memorial path requires at least one reply.
    run_tx(db, |tx| {
        for row in queries::expired_main_bottles(tx, now)? {
            if row.reply_count == 0 {
                queries::delete_bottle(tx, row.id)?;
                report.deleted += 1;
            } else {
                memorial::finalize(tx, row.id, &row.author, now)?;
                report.memorialized += 1;
            }
        }
        Ok(())
    })?;

    // Pass 2: stale holds. The bottle goes back in the water.
    run_tx(db, |tx| {
        for hold in queries::expired_holds(tx, now)? {
            queries::delete_hold(tx, hold.id)?;
            queries::set_bottle_area(tx, hold.bottle_id, "main")?;
            report.holds_released += 1;
        }
        Ok(())
    })?;

    Ok(report)
}

/// Drive the sweep on a fixed interval until the shutdown signal flips.
pub async fn run_sweep_loop(
    db: Arc<Database>,
    interval_secs: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    // the first tick fires immediately; skip it so startup isn't a sweep
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let db = db.clone();
                match tokio::task::spawn_blocking(move || sweep_once(&db)).await {
                    Ok(Ok(report)) => {
                        if !report.is_noop() {
                            info!(
                                deleted = report.deleted,
                                memorialized = report.memorialized,
                                holds_released = report.holds_released,
                                "sweep pass complete"
                            );
                        }
                    }
                    Ok(Err(e)) => warn!("sweep error: {e}"),
                    Err(e) => warn!("sweep join error: {e}"),
                }
            }
            _ = shutdown.changed() => {
                info!("sweep loop stopping");
                return;
            }
        }
    }
}
