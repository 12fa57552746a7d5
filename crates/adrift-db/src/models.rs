//! Database row types — these map directly to SQLite rows.
//! Distinct from the adrift-types API models so the DB layer stays
//! independent; enum columns are stored as text and parsed on the way out.

use anyhow::{Result, anyhow};

use adrift_types::{Area, BlessCurse, Bottle, Kind, Memorial, Reply};

pub struct BottleRow {
    pub id: i64,
    pub item_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: i64,
    pub kind: String,
    pub reply_count: u32,
    pub area: String,
    pub tag: String,
    pub bless_curse: String,
    pub name_send: String,
    pub name_recv: String,
    pub last_holder: Option<String>,
    pub expires_at: Option<i64>,
    pub origin_ip: String,
}

impl BottleRow {
    pub fn into_bottle(self) -> Result<Bottle> {
        Ok(Bottle {
            id: self.id,
            item_id: self.item_id,
            author: self.author,
            content: self.content,
            created_at: self.created_at,
            kind: self
                .kind
                .parse::<Kind>()
                .map_err(|e| anyhow!("bottle {}: {}", self.id, e))?,
            reply_count: self.reply_count,
            area: self
                .area
                .parse::<Area>()
                .map_err(|e| anyhow!("bottle {}: {}", self.id, e))?,
            tag: self.tag,
            bless_curse: self
                .bless_curse
                .parse::<BlessCurse>()
                .map_err(|e| anyhow!("bottle {}: {}", self.id, e))?,
            name_send: self.name_send,
            name_recv: self.name_recv,
            last_holder: self.last_holder,
            expires_at: self.expires_at,
            origin_ip: self.origin_ip,
        })
    }
}

pub struct ReplyRow {
    pub id: i64,
    pub bottle_id: i64,
    pub user: String,
    pub content: String,
    pub created_at: i64,
}

impl ReplyRow {
    pub fn into_reply(self) -> Reply {
        Reply {
            id: self.id,
            bottle_id: self.bottle_id,
            user: self.user,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

pub struct HoldRow {
    pub id: i64,
    pub bottle_id: i64,
    pub holder: String,
    pub held_at: i64,
    pub expires_at: i64,
}

pub struct CooldownRow {
    pub key: String,
    pub until: i64,
    pub violation_count: u32,
    pub window_start: i64,
}

pub struct BanRow {
    pub key: String,
    pub until: i64,
    pub reason: String,
}

pub struct MemorialRow {
    pub id: i64,
    pub bottle_id: i64,
    pub participants: String,
    pub created_at: i64,
}

impl MemorialRow {
    pub fn into_memorial(self) -> Result<Memorial> {
        let participants: Vec<String> = serde_json::from_str(&self.participants)
            .map_err(|e| anyhow!("memorial {}: bad participants: {}", self.id, e))?;
        Ok(Memorial {
            id: self.id,
            bottle_id: self.bottle_id,
            participants,
            created_at: self.created_at,
        })
    }
}
