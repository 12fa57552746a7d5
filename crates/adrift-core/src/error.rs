use anyhow::Error as AnyError;

/// Every business-rule violation maps to exactly one variant, and each
/// rate/validation variant carries the numeric sub-code surfaced to clients.
/// Nothing here is silently corrected; callers render a specific message.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    /// 201 — author has already cast the daily maximum.
    #[error("daily bottle cap reached for author")]
    AuthorDailyCap,

    /// 202 — source IP has already cast the daily maximum.
    #[error("daily bottle cap reached for ip")]
    IpDailyCap,

    /// 301 — creation cooldown still running.
    #[error("cooldown active, retry after {retry_after}s")]
    CooldownActive { retry_after: i64 },

    /// 302 — key is banned.
    #[error("banned until {until}")]
    Banned { until: i64 },

    /// 501 — the bottle already holds its reply quota.
    #[error("reply cap reached")]
    ReplyCapReached,

    /// 601 — the player already has an active hold.
    #[error("already holding a bottle")]
    AlreadyHolding,

    /// 701 — reply content is empty.
    #[error("empty reply content")]
    EmptyReply,

    /// 702 — authors may not reply to their own bottle.
    #[error("cannot reply to own bottle")]
    SelfReply,

    /// 703 — no active hold matching this bottle and holder.
    #[error("no valid hold")]
    NoValidHold,

    /// 801 — memorial re-read cooldown still running.
    #[error("memorial dredge cooldown active")]
    DredgeCooldown,

    /// Dredge target is not in the memorial area.
    #[error("bottle is not a memorial")]
    NotMemorial,

    /// State precondition violated (e.g. withdrawing a bottle that has
    /// already been fished or replied to).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(AnyError),
}

impl CoreError {
    /// Numeric sub-code from the rate/validation taxonomy, where one applies.
    pub fn code(&self) -> Option<u16> {
        match self {
            CoreError::AuthorDailyCap => Some(201),
            CoreError::IpDailyCap => Some(202),
            CoreError::CooldownActive { .. } => Some(301),
            CoreError::Banned { .. } => Some(302),
            CoreError::ReplyCapReached => Some(501),
            CoreError::AlreadyHolding => Some(601),
            CoreError::EmptyReply => Some(701),
            CoreError::SelfReply => Some(702),
            CoreError::NoValidHold => Some(703),
            CoreError::DredgeCooldown => Some(801),
            _ => None,
        }
    }

    /// Seconds the caller should wait before retrying a throttled action.
    pub fn retry_after(&self) -> Option<i64> {
        match self {
            CoreError::CooldownActive { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Epoch second at which an active ban lapses.
    pub fn banned_until(&self) -> Option<i64> {
        match self {
            CoreError::Banned { until } => Some(*until),
            _ => None,
        }
    }
}

impl From<AnyError> for CoreError {
    fn from(e: AnyError) -> Self {
        CoreError::Store(e)
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
