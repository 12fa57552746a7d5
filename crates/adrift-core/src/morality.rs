//! Bounded per-player morality score. Rows are created lazily on the first
//! delta and the score is clamped to [-50, 50] on every update.

use rusqlite::Connection;

use adrift_db::queries;

use crate::error::CoreResult;

pub const MIN_SCORE: i64 = -50;
pub const MAX_SCORE: i64 = 50;

pub fn get(conn: &Connection, player: &str) -> CoreResult<i64> {
    Ok(queries::get_morality(conn, player)?.unwrap_or(0))
}

/// Apply a delta and return the new clamped score.
pub fn apply(conn: &Connection, player: &str, delta: i64) -> CoreResult<i64> {
    let old = queries::get_morality(conn, player)?.unwrap_or(0);
    let new = (old + delta).clamp(MIN_SCORE, MAX_SCORE);
    queries::upsert_morality(conn, player, new)?;
    Ok(new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adrift_db::Database;

    #[test]
    fn defaults_to_zero() {
        let db = Database::open_memory().unwrap();
        db.with_conn(|conn| {
            assert_eq!(get(conn, "nobody")?, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn clamps_both_ends() {
        let db = Database::open_memory().unwrap();
        db.with_conn(|conn| {
            assert_eq!(apply(conn, "ann", 1000)?, MAX_SCORE);
            assert_eq!(apply(conn, "ann", 7)?, MAX_SCORE);
            assert_eq!(apply(conn, "ann", -200)?, MIN_SCORE);
            assert_eq!(apply(conn, "ann", 3)?, MIN_SCORE + 3);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn accumulates_across_calls() {
        let db = Database::open_memory().unwrap();
        db.with_conn(|conn| {
            apply(conn, "bob", 2)?;
            apply(conn, "bob", -5)?;
            assert_eq!(get(conn, "bob")?, -3);
            Ok(())
        })
        .unwrap();
    }
}
