//! Exclusive time-boxed holds. One active hold per bottle, one per holder;
//! expiry is enforced lazily on every read here and eagerly by the sweep.

use rusqlite::Connection;

use adrift_db::models::{BottleRow, HoldRow};
use adrift_db::queries;
use adrift_types::BlessCurse;

use crate::HOLD_TTL_SECS;
use crate::error::{CoreError, CoreResult};

/// Whether the player currently holds any bottle. Holding blocks both
/// fishing again and dredging memorials.
pub fn has_active(conn: &Connection, holder: &str, now: i64) -> CoreResult<bool> {
    Ok(queries::active_hold_for_holder(conn, holder, now)?.is_some())
}

/// Display label a fisher sees: holder name, bottle tag, and the stored
/// bless/curse re-labeled for this holder.
pub fn compose_name_recv(holder: &str, tag: &str, effect: BlessCurse) -> String {
    if tag.is_empty() {
        format!("{holder}{}", effect.label())
    } else {
        format!("{holder} · {tag}{}", effect.label())
    }
}

/// Take the hold: insert the row and flip the bottle to `temp` in the same
/// transaction the caller already opened.
pub fn acquire(conn: &Connection, bottle: &BottleRow, holder: &str, now: i64) -> CoreResult<HoldRow> {
    let effect = bottle
        .bless_curse
        .parse::<BlessCurse>()
        .unwrap_or(BlessCurse::None);
    let name_recv = compose_name_recv(holder, &bottle.tag, effect);

    let expires_at = now + HOLD_TTL_SECS;
    let id = queries::insert_hold(conn, bottle.id, holder, now, expires_at)?;
    queries::mark_bottle_held(conn, bottle.id, holder, &name_recv)?;

    Ok(HoldRow {
        id,
        bottle_id: bottle.id,
        holder: holder.to_string(),
        held_at: now,
        expires_at,
    })
}

/// An unexpired hold on this bottle belonging exactly to this holder must
/// exist before a reply is accepted.
pub fn validate(conn: &Connection, bottle_id: i64, holder: &str, now: i64) -> CoreResult<HoldRow> {
    match queries::active_hold_for_bottle(conn, bottle_id, now)? {
        Some(hold) if hold.holder == holder => Ok(hold),
        _ => Err(CoreError::NoValidHold),
    }
}

/// Forced/administrative release: drop the hold and put the bottle back in
/// `main`.
pub fn release(conn: &Connection, hold_id: i64) -> CoreResult<()> {
    let hold = queries::get_hold(conn, hold_id)?.ok_or(CoreError::NotFound)?;
    queries::delete_hold(conn, hold.id)?;
    queries::set_bottle_area(conn, hold.bottle_id, "main")?;
    Ok(())
}

/// Same effect as [`release`], kept as a distinct entry point for callers
/// that consume a hold outside the reply path.
pub fn consume(conn: &Connection, hold_id: i64) -> CoreResult<()> {
    release(conn, hold_id)
}

pub fn release_all(conn: &Connection, holder: &str) -> CoreResult<usize> {
    let holds = queries::holds_for_holder(conn, holder)?;
    for hold in &holds {
        queries::delete_hold(conn, hold.id)?;
        queries::set_bottle_area(conn, hold.bottle_id, "main")?;
    }
    Ok(holds.len())
}
