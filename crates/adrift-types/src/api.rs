use serde::{Deserialize, Serialize};

use crate::models::{Bottle, Kind, Reply};

// -- Create --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBottleRequest {
    pub author: String,
    pub content: String,
    pub kind: Kind,
    #[serde(rename = "type", default)]
    pub tag: String,
    pub ip: String,
    /// Display label shown to whoever fishes the bottle. Defaults to the
    /// author name.
    #[serde(default)]
    pub name_send: Option<String>,
    /// Game item id the bottle is attached to, if any.
    #[serde(default)]
    pub item_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CreateBottleResponse {
    pub id: i64,
}

// -- Fish --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FishRequest {
    pub player: String,
}

#[derive(Debug, Serialize)]
pub struct FishResponse {
    pub id: i64,
    pub item_id: i64,
    pub status: String,
    pub expires_at: i64,
    pub bottle: Bottle,
    pub replies: Vec<Reply>,
}

// -- Reply --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplyRequest {
    pub user: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplyDirectRequest {
    pub reply_to: i64,
    pub user: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub ok: bool,
    pub reply_count: u32,
    pub memorial_id: Option<i64>,
}

// -- Holds --

#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ReleaseAllResponse {
    pub released: usize,
}

// -- Retrieve (author withdraws an unfished bottle) --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrieveRequest {
    pub author: String,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub ok: bool,
    pub morality: i64,
}

// -- Dredge --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DredgeRequest {
    pub user: String,
}

#[derive(Debug, Serialize)]
pub struct DredgeResponse {
    pub bottle: Bottle,
    pub replies: Vec<Reply>,
}

// -- Morality --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyMoralityRequest {
    pub delta: i64,
}

#[derive(Debug, Serialize)]
pub struct MoralityResponse {
    pub id: String,
    pub morality: i64,
}

// -- Limits --

#[derive(Debug, Deserialize)]
pub struct LimitsQuery {
    pub author: String,
    pub ip: String,
}

#[derive(Debug, Serialize)]
pub struct LimitsResponse {
    pub author_count_today: u32,
    pub ip_count_today: u32,
    pub player_cooldown_until: Option<i64>,
    pub ip_cooldown_until: Option<i64>,
    pub player_ban_until: Option<i64>,
    pub ip_ban_until: Option<i64>,
}

// -- Listing --

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub area: Option<String>,
    pub author: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    50
}
