//! Bottle lifecycle engine: rate limiting, morality, bless/curse rolls,
//! holds, memorials, and the background sweep. Everything mutating walks
//! through one [`adrift_db::Database`] transaction per lifecycle step.

pub mod bottles;
pub mod error;
pub mod holds;
pub mod limits;
pub mod memorial;
pub mod morality;
pub mod oracle;
pub mod sweep;

pub use bottles::BottleService;
pub use error::{CoreError, CoreResult};

/// Hard cap on replies per bottle.
pub const REPLY_CAP: u32 = 5;

/// A hold lasts one hour before the sweep may reclaim it.
pub const HOLD_TTL_SECS: i64 = 3600;

/// Bottles drift for seven days before expiring out of `main`.
pub const BOTTLE_TTL_SECS: i64 = 7 * 86400;

/// Post-create cooldown applied to both the player and the IP key.
pub const CREATE_COOLDOWN_SECS: i64 = 120;

pub const AUTHOR_DAILY_CAP: u32 = 5;
pub const IP_DAILY_CAP: u32 = 10;

/// Memorial claims renew, and dredges repeat, only after seven days.
pub const CLAIM_RENEW_SECS: i64 = 7 * 86400;
pub const DREDGE_COOLDOWN_SECS: i64 = 7 * 86400;

/// Sweep cadence.
pub const SWEEP_INTERVAL_SECS: u64 = 300;

/// Throttled attempts inside this window escalate toward a ban.
pub const VIOLATION_WINDOW_SECS: i64 = 600;
pub const VIOLATION_BAN_THRESHOLD: u32 = 5;
pub const VIOLATION_BAN_SECS: i64 = 86400;

/// Daily quotas reset at midnight UTC+8.
pub const DAY_OFFSET_SECS: i64 = 8 * 3600;

pub(crate) fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
