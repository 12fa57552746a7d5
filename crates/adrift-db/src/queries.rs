//! Row-level operations over an open connection. These are free functions on
//! `&Connection` so the core can compose several of them inside one
//! `Database::with_tx` unit; nothing here commits on its own.

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

use crate::models::{BanRow, BottleRow, CooldownRow, HoldRow, MemorialRow, ReplyRow};

// -- Bottles --

pub struct NewBottle<'a> {
    pub item_id: i64,
    pub author: &'a str,
    pub content: &'a str,
    pub created_at: i64,
    pub kind: &'a str,
    pub tag: &'a str,
    pub bless_curse: &'a str,
    pub name_send: &'a str,
    pub expires_at: Option<i64>,
    pub origin_ip: &'a str,
}

pub fn insert_bottle(conn: &Connection, b: &NewBottle) -> Result<i64> {
    conn.execute(
        "INSERT INTO bottles
            (item_id, author, content, created_at, kind, tag, bless_curse,
             name_send, name_recv, expires_at, origin_ip)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, '', ?9, ?10)",
        params![
            b.item_id,
            b.author,
            b.content,
            b.created_at,
            b.kind,
            b.tag,
            b.bless_curse,
            b.name_send,
            b.expires_at,
            b.origin_ip,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

const BOTTLE_COLS: &str = "id, item_id, author, content, created_at, kind, reply_count, \
                           area, tag, bless_curse, name_send, name_recv, last_holder, \
                           expires_at, origin_ip";

fn bottle_from_row(row: &rusqlite::Row) -> rusqlite::Result<BottleRow> {
    Ok(BottleRow {
        id: row.get(0)?,
        item_id: row.get(1)?,
        author: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        kind: row.get(5)?,
        reply_count: row.get(6)?,
        area: row.get(7)?,
        tag: row.get(8)?,
        bless_curse: row.get(9)?,
        name_send: row.get(10)?,
        name_recv: row.get(11)?,
        last_holder: row.get(12)?,
        expires_at: row.get(13)?,
        origin_ip: row.get(14)?,
    })
}

pub fn get_bottle(conn: &Connection, id: i64) -> Result<Option<BottleRow>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {BOTTLE_COLS} FROM bottles WHERE id = ?1"))?;
    let row = stmt.query_row([id], bottle_from_row).optional()?;
    Ok(row)
}

pub fn list_bottles(
    conn: &Connection,
    area: Option<&str>,
    author: Option<&str>,
    limit: u32,
    offset: u32,
) -> Result<Vec<BottleRow>> {
    let mut sql = format!("SELECT {BOTTLE_COLS} FROM bottles WHERE 1=1");
    let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    if let Some(area) = area {
        sql.push_str(&format!(" AND area = ?{}", args.len() + 1));
        args.push(Box::new(area.to_string()));
    }
    if let Some(author) = author {
        sql.push_str(&format!(" AND author = ?{}", args.len() + 1));
        args.push(Box::new(author.to_string()));
    }
    sql.push_str(&format!(
        " ORDER BY id DESC LIMIT ?{} OFFSET ?{}",
        args.len() + 1,
        args.len() + 2
    ));
    args.push(Box::new(limit));
    args.push(Box::new(offset));

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> = args.iter().map(|a| a.as_ref()).collect();
    let rows = stmt
        .query_map(params.as_slice(), bottle_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Uniform random pick from the pool: unexpired `main` bottles not authored
/// by the fisher.
pub fn random_fishable_bottle(
    conn: &Connection,
    exclude_author: &str,
    now: i64,
) -> Result<Option<BottleRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOTTLE_COLS} FROM bottles
         WHERE area = 'main'
           AND author <> ?1
           AND (expires_at IS NULL OR expires_at > ?2)
         ORDER BY RANDOM() LIMIT 1"
    ))?;
    let row = stmt
        .query_row(params![exclude_author, now], bottle_from_row)
        .optional()?;
    Ok(row)
}

pub fn set_bottle_area(conn: &Connection, id: i64, area: &str) -> Result<()> {
    conn.execute("UPDATE bottles SET area = ?1 WHERE id = ?2", params![area, id])?;
    Ok(())
}

/// Fish-path update: bottle moves to `temp` and records who is holding it.
pub fn mark_bottle_held(
    conn: &Connection,
    id: i64,
    holder: &str,
    name_recv: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE bottles SET area = 'temp', last_holder = ?1, name_recv = ?2 WHERE id = ?3",
        params![holder, name_recv, id],
    )?;
    Ok(())
}

/// Finalize-path update: terminal area, expiry cleared.
pub fn mark_bottle_memorial(conn: &Connection, id: i64) -> Result<()> {
    conn.execute(
        "UPDATE bottles SET area = 'memorial', expires_at = NULL WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

pub fn increment_reply_count(conn: &Connection, id: i64) -> Result<u32> {
    conn.execute(
        "UPDATE bottles SET reply_count = reply_count + 1 WHERE id = ?1",
        params![id],
    )?;
    let count: u32 = conn.query_row(
        "SELECT reply_count FROM bottles WHERE id = ?1",
        params![id],
        |r| r.get(0),
    )?;
    Ok(count)
}

pub fn delete_bottle(conn: &Connection, id: i64) -> Result<bool> {
    let n = conn.execute("DELETE FROM bottles WHERE id = ?1", params![id])?;
    Ok(n > 0)
}

pub fn count_bottles_by_author_since(conn: &Connection, author: &str, since: i64) -> Result<u32> {
    let n: u32 = conn.query_row(
        "SELECT COUNT(*) FROM bottles WHERE author = ?1 AND created_at >= ?2",
        params![author, since],
        |r| r.get(0),
    )?;
    Ok(n)
}

pub fn count_bottles_by_ip_since(conn: &Connection, ip: &str, since: i64) -> Result<u32> {
    let n: u32 = conn.query_row(
        "SELECT COUNT(*) FROM bottles WHERE origin_ip = ?1 AND created_at >= ?2",
        params![ip, since],
        |r| r.get(0),
    )?;
    Ok(n)
}

/// Expired bottles still sitting in `main` — the sweep's pass-1 input.
pub fn expired_main_bottles(conn: &Connection, now: i64) -> Result<Vec<BottleRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOTTLE_COLS} FROM bottles
         WHERE area = 'main' AND expires_at IS NOT NULL AND expires_at <= ?1"
    ))?;
    let rows = stmt
        .query_map(params![now], bottle_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// -- Replies --

pub fn insert_reply(
    conn: &Connection,
    bottle_id: i64,
    user: &str,
    content: &str,
    now: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO replies (bottle_id, user, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![bottle_id, user, content, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn replies_for_bottle(conn: &Connection, bottle_id: i64) -> Result<Vec<ReplyRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, bottle_id, user, content, created_at FROM replies
         WHERE bottle_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map([bottle_id], |row| {
            Ok(ReplyRow {
                id: row.get(0)?,
                bottle_id: row.get(1)?,
                user: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Distinct repliers in first-reply order, for memorial participants.
pub fn distinct_repliers(conn: &Connection, bottle_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user FROM replies WHERE bottle_id = ?1 GROUP BY user ORDER BY MIN(id) ASC",
    )?;
    let rows = stmt
        .query_map([bottle_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// -- Players --

pub fn get_morality(conn: &Connection, player: &str) -> Result<Option<i64>> {
    let score = conn
        .query_row(
            "SELECT morality FROM players WHERE id = ?1",
            params![player],
            |r| r.get(0),
        )
        .optional()?;
    Ok(score)
}

pub fn upsert_morality(conn: &Connection, player: &str, score: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO players (id, morality) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET morality = excluded.morality",
        params![player, score],
    )?;
    Ok(())
}

// -- Holds --

fn hold_from_row(row: &rusqlite::Row) -> rusqlite::Result<HoldRow> {
    Ok(HoldRow {
        id: row.get(0)?,
        bottle_id: row.get(1)?,
        holder: row.get(2)?,
        held_at: row.get(3)?,
        expires_at: row.get(4)?,
    })
}

pub fn insert_hold(
    conn: &Connection,
    bottle_id: i64,
    holder: &str,
    held_at: i64,
    expires_at: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO holds (bottle_id, holder, held_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![bottle_id, holder, held_at, expires_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_hold(conn: &Connection, id: i64) -> Result<Option<HoldRow>> {
    let row = conn
        .query_row(
            "SELECT id, bottle_id, holder, held_at, expires_at FROM holds WHERE id = ?1",
            params![id],
            hold_from_row,
        )
        .optional()?;
    Ok(row)
}

/// Active (unexpired) hold on a bottle. At most one exists by construction.
pub fn active_hold_for_bottle(
    conn: &Connection,
    bottle_id: i64,
    now: i64,
) -> Result<Option<HoldRow>> {
    let row = conn
        .query_row(
            "SELECT id, bottle_id, holder, held_at, expires_at FROM holds
             WHERE bottle_id = ?1 AND expires_at > ?2",
            params![bottle_id, now],
            hold_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn active_hold_for_holder(
    conn: &Connection,
    holder: &str,
    now: i64,
) -> Result<Option<HoldRow>> {
    let row = conn
        .query_row(
            "SELECT id, bottle_id, holder, held_at, expires_at FROM holds
             WHERE holder = ?1 AND expires_at > ?2
             ORDER BY id ASC LIMIT 1",
            params![holder, now],
            hold_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn holds_for_holder(conn: &Connection, holder: &str) -> Result<Vec<HoldRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, bottle_id, holder, held_at, expires_at FROM holds WHERE holder = ?1",
    )?;
    let rows = stmt
        .query_map(params![holder], hold_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn expired_holds(conn: &Connection, now: i64) -> Result<Vec<HoldRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, bottle_id, holder, held_at, expires_at FROM holds WHERE expires_at <= ?1",
    )?;
    let rows = stmt
        .query_map(params![now], hold_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete_hold(conn: &Connection, id: i64) -> Result<bool> {
    let n = conn.execute("DELETE FROM holds WHERE id = ?1", params![id])?;
    Ok(n > 0)
}

// -- Cooldowns / bans --

pub fn get_cooldown(conn: &Connection, key: &str) -> Result<Option<CooldownRow>> {
    let row = conn
        .query_row(
            "SELECT key, until, violation_count, window_start FROM cooldowns WHERE key = ?1",
            params![key],
            |row| {
                Ok(CooldownRow {
                    key: row.get(0)?,
                    until: row.get(1)?,
                    violation_count: row.get(2)?,
                    window_start: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn upsert_cooldown(
    conn: &Connection,
    key: &str,
    until: i64,
    violation_count: u32,
    window_start: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO cooldowns (key, until, violation_count, window_start)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(key) DO UPDATE SET
            until = excluded.until,
            violation_count = excluded.violation_count,
            window_start = excluded.window_start",
        params![key, until, violation_count, window_start],
    )?;
    Ok(())
}

pub fn get_ban(conn: &Connection, key: &str) -> Result<Option<BanRow>> {
    let row = conn
        .query_row(
            "SELECT key, until, reason FROM bans WHERE key = ?1",
            params![key],
            |row| {
                Ok(BanRow {
                    key: row.get(0)?,
                    until: row.get(1)?,
                    reason: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn upsert_ban(conn: &Connection, key: &str, until: i64, reason: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO bans (key, until, reason) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET until = excluded.until, reason = excluded.reason",
        params![key, until, reason],
    )?;
    Ok(())
}

// -- Memorials --

/// Idempotent finalize insert; concurrent last-replies race on the unique
/// bottle_id, the loser is a no-op.
pub fn insert_memorial_ignore(
    conn: &Connection,
    bottle_id: i64,
    participants_json: &str,
    now: i64,
) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO memorials (bottle_id, participants, created_at)
         VALUES (?1, ?2, ?3)",
        params![bottle_id, participants_json, now],
    )?;
    Ok(())
}

pub fn memorial_for_bottle(conn: &Connection, bottle_id: i64) -> Result<Option<MemorialRow>> {
    let row = conn
        .query_row(
            "SELECT id, bottle_id, participants, created_at FROM memorials WHERE bottle_id = ?1",
            params![bottle_id],
            |row| {
                Ok(MemorialRow {
                    id: row.get(0)?,
                    bottle_id: row.get(1)?,
                    participants: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn get_claim(conn: &Connection, memorial_id: i64, player: &str) -> Result<Option<i64>> {
    let obtained_at = conn
        .query_row(
            "SELECT obtained_at FROM memorial_claims WHERE memorial_id = ?1 AND player_id = ?2",
            params![memorial_id, player],
            |r| r.get(0),
        )
        .optional()?;
    Ok(obtained_at)
}

pub fn upsert_claim(conn: &Connection, memorial_id: i64, player: &str, now: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO memorial_claims (memorial_id, player_id, obtained_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(memorial_id, player_id) DO UPDATE SET obtained_at = excluded.obtained_at",
        params![memorial_id, player, now],
    )?;
    Ok(())
}

// -- Dredge log --

pub fn last_dredge_at(conn: &Connection, bottle_id: i64, user: &str) -> Result<Option<i64>> {
    let at = conn
        .query_row(
            "SELECT MAX(created_at) FROM dredge_logs WHERE bottle_id = ?1 AND user = ?2",
            params![bottle_id, user],
            |r| r.get::<_, Option<i64>>(0),
        )
        .optional()?
        .flatten();
    Ok(at)
}

pub fn insert_dredge_log(conn: &Connection, bottle_id: i64, user: &str, now: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO dredge_logs (bottle_id, user, created_at) VALUES (?1, ?2, ?3)",
        params![bottle_id, user, now],
    )?;
    Ok(())
}
