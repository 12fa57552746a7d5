use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const SCHEMA_VERSION: i64 = 1;

/// Versioned migrations keyed off a `schema_version` table, so new optional
/// columns can land additively without data loss.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("DB: running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE bottles (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id      INTEGER NOT NULL DEFAULT 0,
                author       TEXT NOT NULL,
                content      TEXT NOT NULL,
                created_at   INTEGER NOT NULL,
                kind         TEXT NOT NULL DEFAULT 'normal',
                reply_count  INTEGER NOT NULL DEFAULT 0,
                area         TEXT NOT NULL DEFAULT 'main',
                tag          TEXT NOT NULL DEFAULT '',
                bless_curse  TEXT NOT NULL DEFAULT 'none',
                name_send    TEXT NOT NULL DEFAULT '',
                name_recv    TEXT NOT NULL DEFAULT '',
                last_holder  TEXT,
                expires_at   INTEGER,
                origin_ip    TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX idx_bottles_area ON bottles(area, expires_at);
            CREATE INDEX idx_bottles_author ON bottles(author, created_at);
            CREATE INDEX idx_bottles_ip ON bottles(origin_ip, created_at);

            CREATE TABLE replies (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                bottle_id   INTEGER NOT NULL REFERENCES bottles(id) ON DELETE CASCADE,
                user        TEXT NOT NULL,
                content     TEXT NOT NULL,
                created_at  INTEGER NOT NULL
            );

            CREATE INDEX idx_replies_bottle ON replies(bottle_id);

            CREATE TABLE players (
                id        TEXT PRIMARY KEY,
                morality  INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE holds (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                bottle_id   INTEGER NOT NULL REFERENCES bottles(id) ON DELETE CASCADE,
                holder      TEXT NOT NULL,
                held_at     INTEGER NOT NULL,
                expires_at  INTEGER NOT NULL
            );

            CREATE INDEX idx_holds_holder ON holds(holder, expires_at);
            CREATE INDEX idx_holds_bottle ON holds(bottle_id);

            CREATE TABLE cooldowns (
                key              TEXT PRIMARY KEY,
                until            INTEGER NOT NULL,
                violation_count  INTEGER NOT NULL DEFAULT 0,
                window_start     INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE bans (
                key     TEXT PRIMARY KEY,
                until   INTEGER NOT NULL,
                reason  TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE memorials (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                bottle_id     INTEGER NOT NULL UNIQUE REFERENCES bottles(id) ON DELETE CASCADE,
                participants  TEXT NOT NULL DEFAULT '[]',
                created_at    INTEGER NOT NULL
            );

            CREATE TABLE memorial_claims (
                memorial_id  INTEGER NOT NULL REFERENCES memorials(id) ON DELETE CASCADE,
                player_id    TEXT NOT NULL,
                obtained_at  INTEGER NOT NULL,
                PRIMARY KEY (memorial_id, player_id)
            );

            CREATE TABLE dredge_logs (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                bottle_id   INTEGER NOT NULL REFERENCES bottles(id) ON DELETE CASCADE,
                user        TEXT NOT NULL,
                created_at  INTEGER NOT NULL
            );

            CREATE INDEX idx_dredge_bottle_user ON dredge_logs(bottle_id, user, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
