//! Creation-side rate limiting: bans, cooldowns, daily quotas, and the
//! violation escalation that turns cooldown hammering into a ban. Reply-style
//! actions are deliberately not gated here; only hold validity and the
//! per-bottle reply cap apply to those.

use rusqlite::Connection;
use tracing::warn;

use adrift_db::queries;
use adrift_types::api::LimitsResponse;

use crate::error::{CoreError, CoreResult};
use crate::{
    AUTHOR_DAILY_CAP, CREATE_COOLDOWN_SECS, DAY_OFFSET_SECS, IP_DAILY_CAP,
    VIOLATION_BAN_SECS, VIOLATION_BAN_THRESHOLD, VIOLATION_WINDOW_SECS,
};

pub fn player_key(player: &str) -> String {
    format!("player:{player}")
}

pub fn ip_key(ip: &str) -> String {
    format!("ip:{ip}")
}

/// Start of the current quota day. The boundary is midnight in a fixed UTC+8
/// offset: floor((now + 8h) / 24h) * 24h - 8h.
pub fn day_start(now: i64) -> i64 {
    (now + DAY_OFFSET_SECS).div_euclid(86400) * 86400 - DAY_OFFSET_SECS
}

/// Run the creation gate in its fixed order: player ban, ip ban, player
/// cooldown, ip cooldown, author daily cap, ip daily cap.
///
/// Rejections come back as `Ok(Some(_))` rather than `Err` so that the
/// violation bookkeeping written while checking still commits; `Err` is
/// reserved for store failures, which roll the transaction back.
pub fn check_create(
    conn: &Connection,
    author: &str,
    ip: &str,
    now: i64,
) -> CoreResult<Option<CoreError>> {
    let pkey = player_key(author);
    let ikey = ip_key(ip);

    for key in [pkey.as_str(), ikey.as_str()] {
        if let Some(ban) = queries::get_ban(conn, key)? {
            if ban.until > now {
                return Ok(Some(CoreError::Banned { until: ban.until }));
            }
        }
    }

    for key in [pkey.as_str(), ikey.as_str()] {
        if let Some(cd) = queries::get_cooldown(conn, key)? {
            if cd.until > now {
                note_violation(conn, key, cd.until, now)?;
                return Ok(Some(CoreError::CooldownActive {
                    retry_after: cd.until - now,
                }));
            }
        }
    }

    let since = day_start(now);
    if queries::count_bottles_by_author_since(conn, author, since)? >= AUTHOR_DAILY_CAP {
        return Ok(Some(CoreError::AuthorDailyCap));
    }
    if queries::count_bottles_by_ip_since(conn, ip, since)? >= IP_DAILY_CAP {
        return Ok(Some(CoreError::IpDailyCap));
    }

    Ok(None)
}

/// Both keys enter a fresh cooldown after a successful create, with the
/// violation counter reset.
pub fn record_success(conn: &Connection, author: &str, ip: &str, now: i64) -> CoreResult<()> {
    let until = now + CREATE_COOLDOWN_SECS;
    queries::upsert_cooldown(conn, &player_key(author), until, 0, now)?;
    queries::upsert_cooldown(conn, &ip_key(ip), until, 0, now)?;
    Ok(())
}

/// A create attempt landed while this key's cooldown was still running.
/// Count it; enough violations inside the window escalate to a day ban.
fn note_violation(conn: &Connection, key: &str, until: i64, now: i64) -> CoreResult<()> {
    let (count, window_start) = match queries::get_cooldown(conn, key)? {
        Some(cd) if now - cd.window_start <= VIOLATION_WINDOW_SECS => {
            (cd.violation_count + 1, cd.window_start)
        }
        _ => (1, now),
    };
    queries::upsert_cooldown(conn, key, until, count, window_start)?;

    if count >= VIOLATION_BAN_THRESHOLD {
        warn!(key, count, "cooldown abuse, banning for 24h");
        queries::upsert_ban(conn, key, now + VIOLATION_BAN_SECS, "cooldown abuse")?;
    }
    Ok(())
}

/// Current counters and timestamps for the CheckLimits surface.
pub fn snapshot(conn: &Connection, author: &str, ip: &str, now: i64) -> CoreResult<LimitsResponse> {
    let since = day_start(now);
    let active = |until: i64| if until > now { Some(until) } else { None };

    Ok(LimitsResponse {
        author_count_today: queries::count_bottles_by_author_since(conn, author, since)?,
        ip_count_today: queries::count_bottles_by_ip_since(conn, ip, since)?,
        player_cooldown_until: queries::get_cooldown(conn, &player_key(author))?
            .and_then(|c| active(c.until)),
        ip_cooldown_until: queries::get_cooldown(conn, &ip_key(ip))?.and_then(|c| active(c.until)),
        player_ban_until: queries::get_ban(conn, &player_key(author))?
            .and_then(|b| active(b.until)),
        ip_ban_until: queries::get_ban(conn, &ip_key(ip))?.and_then(|b| active(b.until)),
    })
}
