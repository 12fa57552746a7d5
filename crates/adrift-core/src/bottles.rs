//! Bottle lifecycle orchestration. Every operation that mutates runs as one
//! transaction over the shared store; concurrent requests serialize on the
//! single writer, so counts, caps, and area flips are never observed
//! half-applied.

use std::sync::Arc;

use rusqlite::Transaction;
use tracing::{debug, info};

use adrift_db::{Database, queries};
use adrift_types::api::{DredgeResponse, FishResponse, LimitsResponse, ReplyResponse};
use adrift_types::{Area, Bottle, Kind, Reply};

use crate::error::{CoreError, CoreResult};
use crate::{BOTTLE_TTL_SECS, REPLY_CAP, holds, limits, memorial, morality, now_ts, oracle};

pub struct CreateBottle<'a> {
    pub author: &'a str,
    pub content: &'a str,
    pub kind: Kind,
    pub tag: &'a str,
    pub ip: &'a str,
    pub name_send: Option<&'a str>,
    pub item_id: i64,
}

/// The collaborator-facing surface over the lifecycle engine. Constructed
/// once at startup with the store handle and shared by every request handler
/// and the sweep.
#[derive(Clone)]
pub struct BottleService {
    db: Arc<Database>,
}

impl BottleService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Run `f` transactionally, translating business rejections back out of
    /// the store error channel so the caller sees the typed variant.
    pub(crate) fn run_tx<T>(
        &self,
        f: impl FnOnce(&Transaction) -> CoreResult<T>,
    ) -> CoreResult<T> {
        run_tx(&self.db, f)
    }

    /// Cast a new bottle. Rate gate → morality delta → bless/curse roll →
    /// insert → cooldowns, with the roll using the post-delta score.
    pub fn create(&self, req: &CreateBottle) -> CoreResult<i64> {
        if req.author.trim().is_empty() {
            return Err(CoreError::InvalidInput("author is required".into()));
        }
        if req.content.trim().is_empty() {
            return Err(CoreError::InvalidInput("content is required".into()));
        }
        if req.ip.trim().is_empty() {
            return Err(CoreError::InvalidInput("ip is required".into()));
        }

        let now = now_ts();

        // Gate first, in its own transaction: a throttled attempt must keep
        // its violation bookkeeping even though the create fails.
        if let Some(reject) = self.run_tx(|tx| limits::check_create(tx, req.author, req.ip, now))? {
            debug!(author = req.author, %reject, "create rejected by rate gate");
            return Err(reject);
        }

        let id = self.run_tx(|tx| {
            // Re-run the gate inside the writing transaction so a racing
            // create cannot slip past the daily caps.
            if let Some(reject) = limits::check_create(tx, req.author, req.ip, now)? {
                return Err(reject);
            }

            let score = morality::apply(tx, req.author, req.kind.cast_delta())?;
            let effect = oracle::draw(score);

            let id = queries::insert_bottle(
                tx,
                &queries::NewBottle {
                    item_id: req.item_id,
                    author: req.author,
                    content: req.content,
                    created_at: now,
                    kind: req.kind.as_str(),
                    tag: req.tag,
                    bless_curse: effect.as_str(),
                    name_send: req.name_send.unwrap_or(req.author),
                    expires_at: Some(now + BOTTLE_TTL_SECS),
                    origin_ip: req.ip,
                },
            )?;
            limits::record_success(tx, req.author, req.ip, now)?;
            Ok(id)
        })?;

        info!(id, author = req.author, kind = req.kind.as_str(), "bottle cast");
        Ok(id)
    }

    /// Fish a random bottle from `main` and take a one-hour hold on it.
    /// `FishResponse.id` identifies the hold; the bottle rides along in full.
    pub fn fish(&self, player: &str) -> CoreResult<FishResponse> {
        if player.trim().is_empty() {
            return Err(CoreError::InvalidInput("player is required".into()));
        }
        let now = now_ts();

        self.run_tx(|tx| {
            if holds::has_active(tx, player, now)? {
                return Err(CoreError::AlreadyHolding);
            }

            let row = queries::random_fishable_bottle(tx, player, now)?
                .ok_or(CoreError::NotFound)?;
            let hold = holds::acquire(tx, &row, player, now)?;

            // re-read so the response reflects the held state
            let bottle = queries::get_bottle(tx, row.id)?
                .ok_or(CoreError::NotFound)?
                .into_bottle()?;
            let replies = load_replies(tx, bottle.id)?;

            info!(bottle_id = bottle.id, player, hold_id = hold.id, "bottle fished");
            Ok(FishResponse {
                id: hold.id,
                item_id: bottle.item_id,
                status: "held".to_string(),
                expires_at: hold.expires_at,
                bottle,
                replies,
            })
        })
    }

    /// Reply while holding the bottle. Appends the reply, consumes the hold,
    /// and finalizes the memorial when the cap is reached — one transaction.
    pub fn reply(&self, bottle_id: i64, user: &str, content: &str) -> CoreResult<ReplyResponse> {
        self.append_reply(bottle_id, user, content)
    }

    /// Reply-to + content in one call. Same semantics as [`Self::reply`];
    /// kept as a distinct entry point for the combined client call.
    pub fn reply_direct(&self, reply_to: i64, user: &str, content: &str) -> CoreResult<ReplyResponse> {
        self.append_reply(reply_to, user, content)
    }

    fn append_reply(&self, bottle_id: i64, user: &str, content: &str) -> CoreResult<ReplyResponse> {
        if content.trim().is_empty() {
            return Err(CoreError::EmptyReply);
        }
        let now = now_ts();

        self.run_tx(|tx| {
            let row = queries::get_bottle(tx, bottle_id)?.ok_or(CoreError::NotFound)?;
            if row.author == user {
                return Err(CoreError::SelfReply);
            }

            let hold = holds::validate(tx, bottle_id, user, now)?;

            if row.reply_count >= REPLY_CAP {
                return Err(CoreError::ReplyCapReached);
            }

            queries::insert_reply(tx, bottle_id, user, content, now)?;
            let reply_count = queries::increment_reply_count(tx, bottle_id)?;
            queries::delete_hold(tx, hold.id)?;

            let memorial_id = if reply_count >= REPLY_CAP {
                let mid = memorial::finalize(tx, bottle_id, &row.author, now)?;
                // the finishing replier gets an automatic claim attempt; a
                // rejected one nulls the id but the reply still succeeds
                if memorial::claim(tx, mid, user, now)? {
                    Some(mid)
                } else {
                    None
                }
            } else {
                queries::set_bottle_area(tx, bottle_id, Area::Main.as_str())?;
                None
            };

            debug!(bottle_id, user, reply_count, "reply appended");
            Ok(ReplyResponse {
                ok: true,
                reply_count,
                memorial_id,
            })
        })
    }

    pub fn release_hold(&self, hold_id: i64) -> CoreResult<()> {
        self.run_tx(|tx| holds::release(tx, hold_id))
    }

    pub fn release_all(&self, player: &str) -> CoreResult<usize> {
        self.run_tx(|tx| holds::release_all(tx, player))
    }

    /// The author withdraws their own unfished bottle. Deletes it and
    /// reverses the cast's morality delta; returns the new score.
    pub fn retrieve(&self, bottle_id: i64, author: &str) -> CoreResult<i64> {
        self.run_tx(|tx| {
            let row = queries::get_bottle(tx, bottle_id)?.ok_or(CoreError::NotFound)?;
            if row.author != author {
                return Err(CoreError::Forbidden);
            }
            if row.area != Area::Main.as_str() || row.reply_count > 0 {
                return Err(CoreError::Conflict(
                    "bottle has been fished or replied to".into(),
                ));
            }

            let kind = row
                .kind
                .parse::<Kind>()
                .map_err(|e| CoreError::Store(anyhow::anyhow!(e)))?;
            queries::delete_bottle(tx, bottle_id)?;
            let score = morality::apply(tx, author, kind.retrieve_delta())?;
            info!(bottle_id, author, "bottle retrieved by author");
            Ok(score)
        })
    }

    pub fn dredge(&self, bottle_id: i64, user: &str) -> CoreResult<DredgeResponse> {
        let now = now_ts();
        self.run_tx(|tx| {
            let (bottle, replies) = memorial::dredge(tx, bottle_id, user, now)?;
            Ok(DredgeResponse { bottle, replies })
        })
    }

    pub fn get_morality(&self, player: &str) -> CoreResult<i64> {
        self.db
            .with_conn(|conn| morality::get(conn, player).map_err(anyhow::Error::new))
            .map_err(unwrap_core)
    }

    pub fn apply_morality(&self, player: &str, delta: i64) -> CoreResult<i64> {
        self.run_tx(|tx| morality::apply(tx, player, delta))
    }

    pub fn check_limits(&self, author: &str, ip: &str) -> CoreResult<LimitsResponse> {
        let now = now_ts();
        self.db
            .with_conn(|conn| limits::snapshot(conn, author, ip, now).map_err(anyhow::Error::new))
            .map_err(unwrap_core)
    }

    pub fn get_bottle(&self, id: i64) -> CoreResult<(Bottle, Vec<Reply>)> {
        self.db
            .with_conn(|conn| {
                let bottle = match queries::get_bottle(conn, id)? {
                    Some(row) => row.into_bottle()?,
                    None => return Err(anyhow::Error::new(CoreError::NotFound)),
                };
                let replies = load_replies(conn, id).map_err(anyhow::Error::new)?;
                Ok((bottle, replies))
            })
            .map_err(unwrap_core)
    }

    /// Newest-first listing with optional area/author filters.
    pub fn list(
        &self,
        area: Option<Area>,
        author: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> CoreResult<Vec<Bottle>> {
        self.db
            .with_conn(|conn| {
                let rows = queries::list_bottles(
                    conn,
                    area.map(|a| a.as_str()),
                    author,
                    limit.min(200),
                    offset,
                )?;
                rows.into_iter().map(|r| r.into_bottle()).collect()
            })
            .map_err(unwrap_core)
    }
}

fn load_replies(conn: &rusqlite::Connection, bottle_id: i64) -> CoreResult<Vec<Reply>> {
    Ok(queries::replies_for_bottle(conn, bottle_id)?
        .into_iter()
        .map(|r| r.into_reply())
        .collect())
}

/// Transactional runner shared with the sweep: commits on `Ok`, rolls back
/// on `Err`, and surfaces a business rejection as its typed variant instead
/// of a store error.
pub(crate) fn run_tx<T>(
    db: &Database,
    f: impl FnOnce(&Transaction) -> CoreResult<T>,
) -> CoreResult<T> {
    db.with_tx(|tx| f(tx).map_err(anyhow::Error::new))
        .map_err(unwrap_core)
}

fn unwrap_core(e: anyhow::Error) -> CoreError {
    match e.downcast::<CoreError>() {
        Ok(core) => core,
        Err(other) => CoreError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adrift_types::BlessCurse;

    fn service() -> BottleService {
        BottleService::new(Arc::new(Database::open_memory().unwrap()))
    }

    fn clear_cooldowns(svc: &BottleService) {
        svc.db()
            .with_conn(|conn| {
                conn.execute("DELETE FROM cooldowns", [])?;
                Ok(())
            })
            .unwrap();
    }

    fn cast(svc: &BottleService, author: &str, kind: Kind) -> i64 {
        clear_cooldowns(svc);
        svc.create(&CreateBottle {
            author,
            content: "a note adrift",
            kind,
            tag: "letter",
            ip: "10.0.0.1",
            name_send: None,
            item_id: 7,
        })
        .unwrap()
    }

    #[test]
    fn create_validates_input() {
        let svc = service();
        let bad = svc.create(&CreateBottle {
            author: "ann",
            content: "   ",
            kind: Kind::Normal,
            tag: "",
            ip: "10.0.0.1",
            name_send: None,
            item_id: 0,
        });
        assert!(matches!(bad, Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn create_applies_morality_before_roll_and_sets_cooldown() {
        let svc = service();
        let id = cast(&svc, "ann", Kind::Good);
        assert_eq!(svc.get_morality("ann").unwrap(), 1);

        let (bottle, _) = svc.get_bottle(id).unwrap();
        assert_eq!(bottle.kind, Kind::Good);
        assert_eq!(bottle.area, Area::Main);
        assert!(bottle.expires_at.is_some());

        // the fresh cooldown gates an immediate second create
        let again = svc.create(&CreateBottle {
            author: "ann",
            content: "again",
            kind: Kind::Normal,
            tag: "",
            ip: "10.0.0.1",
            name_send: None,
            item_id: 0,
        });
        assert!(matches!(again, Err(CoreError::CooldownActive { .. })));
    }

    #[test]
    fn sixth_create_of_the_day_hits_author_cap() {
        let svc = service();
        for i in 0..5 {
            clear_cooldowns(&svc);
            svc.create(&CreateBottle {
                author: "ann",
                content: "note",
                kind: Kind::Normal,
                tag: "",
                ip: &format!("10.0.0.{i}"),
                name_send: None,
                item_id: 0,
            })
            .unwrap();
        }
        clear_cooldowns(&svc);
        let sixth = svc.create(&CreateBottle {
            author: "ann",
            content: "one more",
            kind: Kind::Normal,
            tag: "",
            ip: "10.0.0.9",
            name_send: None,
            item_id: 0,
        });
        match sixth {
            Err(e @ CoreError::AuthorDailyCap) => assert_eq!(e.code(), Some(201)),
            other => panic!("expected daily cap, got {other:?}"),
        }
    }

    #[test]
    fn fish_then_reply_releases_hold_and_returns_bottle_to_main() {
        let svc = service();
        let id = cast(&svc, "ann", Kind::Bad);

        let fished = svc.fish("bob").unwrap();
        assert_eq!(fished.bottle.id, id);
        assert_eq!(fished.bottle.area, Area::Temp);
        assert_eq!(fished.status, "held");

        // a second fish while holding is refused
        assert!(matches!(svc.fish("bob"), Err(CoreError::AlreadyHolding)));

        let res = svc.reply(id, "bob", "got your message").unwrap();
        assert!(res.ok);
        assert_eq!(res.reply_count, 1);
        assert_eq!(res.memorial_id, None);

        let (bottle, replies) = svc.get_bottle(id).unwrap();
        assert_eq!(bottle.area, Area::Main);
        assert_eq!(replies.len(), 1);

        // hold was consumed with the reply
        assert!(svc.fish("bob").is_ok());
    }

    #[test]
    fn reply_without_hold_is_refused() {
        let svc = service();
        let id = cast(&svc, "ann", Kind::Normal);
        assert!(matches!(
            svc.reply(id, "bob", "drive-by"),
            Err(CoreError::NoValidHold)
        ));
    }

    #[test]
    fn empty_reply_and_self_reply_are_refused() {
        let svc = service();
        let id = cast(&svc, "ann", Kind::Normal);

        assert!(matches!(
            svc.reply(id, "bob", "  "),
            Err(CoreError::EmptyReply)
        ));
        // self-reply refused regardless of hold state
        assert!(matches!(
            svc.reply(id, "ann", "it is me"),
            Err(CoreError::SelfReply)
        ));
    }

    #[test]
    fn fifth_reply_finalizes_memorial_and_every_replier_can_claim() {
        let svc = service();
        let id = cast(&svc, "ann", Kind::Normal);

        let users = ["u1", "u2", "u3", "u4", "u5"];
        for (i, user) in users.iter().enumerate() {
            let fished = svc.fish(user).unwrap();
            assert_eq!(fished.bottle.id, id);
            let res = svc.reply_direct(id, user, "reply").unwrap();
            assert_eq!(res.reply_count as usize, i + 1);
            if i < 4 {
                assert_eq!(res.memorial_id, None);
            } else {
                // the 5th reply finalized and auto-claimed for u5
                assert!(res.memorial_id.is_some());
            }
        }

        let (bottle, replies) = svc.get_bottle(id).unwrap();
        assert_eq!(bottle.area, Area::Memorial);
        assert_eq!(bottle.reply_count, 5);
        assert_eq!(replies.len(), 5);

        // a memorial bottle is no longer fishable
        assert!(matches!(svc.fish("u1"), Err(CoreError::NotFound)));

        // the other participants claim within the window
        svc.run_tx(|tx| {
            let mid = queries::memorial_for_bottle(tx, id)?.unwrap().id;
            for user in ["ann", "u1", "u2", "u3", "u4"] {
                assert!(memorial::claim(tx, mid, user, now_ts())?);
            }
            // u5 already auto-claimed; a repeat inside 7 days is refused
            assert!(!memorial::claim(tx, mid, "u5", now_ts())?);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn sixth_reply_fails_cleanly_at_the_cap() {
        let svc = service();
        let id = cast(&svc, "ann", Kind::Normal);
        for user in ["u1", "u2", "u3", "u4", "u5"] {
            svc.fish(user).unwrap();
            svc.reply(id, user, "reply").unwrap();
        }

        // force a hold past the memorial transition to prove the cap check
        // itself holds the line
        svc.run_tx(|tx| {
            queries::insert_hold(tx, id, "u6", now_ts(), now_ts() + 3600)?;
            Ok(())
        })
        .unwrap();

        let res = svc.reply(id, "u6", "late");
        match res {
            Err(e @ CoreError::ReplyCapReached) => assert_eq!(e.code(), Some(501)),
            other => panic!("expected cap error, got {other:?}"),
        }

        let (bottle, replies) = svc.get_bottle(id).unwrap();
        assert_eq!(bottle.reply_count, 5);
        assert_eq!(replies.len(), 5);
    }

    #[test]
    fn retrieve_reverses_the_cast_delta() {
        let svc = service();
        let id = cast(&svc, "ann", Kind::Bad);
        assert_eq!(svc.get_morality("ann").unwrap(), -5);

        // wrong author cannot withdraw
        assert!(matches!(svc.retrieve(id, "eve"), Err(CoreError::Forbidden)));

        let score = svc.retrieve(id, "ann").unwrap();
        assert_eq!(score, 0);
        assert!(matches!(svc.get_bottle(id), Err(CoreError::NotFound)));
    }

    #[test]
    fn retrieve_refused_once_fished_or_replied() {
        let svc = service();
        let id = cast(&svc, "ann", Kind::Good);
        svc.fish("bob").unwrap();

        // held bottle sits in temp
        assert!(matches!(svc.retrieve(id, "ann"), Err(CoreError::Conflict(_))));

        svc.reply(id, "bob", "too late").unwrap();
        assert!(matches!(svc.retrieve(id, "ann"), Err(CoreError::Conflict(_))));
    }

    #[test]
    fn release_all_frees_the_player() {
        let svc = service();
        cast(&svc, "ann", Kind::Normal);

        svc.fish("bob").unwrap();
        assert!(matches!(svc.fish("bob"), Err(CoreError::AlreadyHolding)));

        assert_eq!(svc.release_all("bob").unwrap(), 1);
        assert!(svc.fish("bob").is_ok());
    }

    #[test]
    fn release_hold_by_id() {
        let svc = service();
        cast(&svc, "ann", Kind::Normal);
        let fished = svc.fish("bob").unwrap();

        svc.release_hold(fished.id).unwrap();
        assert_eq!(fished.bottle.id, svc.fish("cat").unwrap().bottle.id);
        assert!(matches!(
            svc.release_hold(fished.id),
            Err(CoreError::NotFound)
        ));
    }

    #[test]
    fn dredge_after_memorial_honors_identity() {
        let svc = service();
        let id = cast(&svc, "ann", Kind::Normal);
        for user in ["u1", "u2", "u3", "u4", "u5"] {
            svc.fish(user).unwrap();
            svc.reply(id, user, "reply").unwrap();
        }

        let out = svc.dredge(id, "u2").unwrap();
        assert_eq!(out.bottle.id, id);
        assert_eq!(out.replies.len(), 5);

        assert!(matches!(svc.dredge(id, "eve"), Err(CoreError::Forbidden)));
        assert!(matches!(
            svc.dredge(id, "u2"),
            Err(CoreError::DredgeCooldown)
        ));
    }

    #[test]
    fn fished_bottle_relabels_stored_effect_without_rerolling() {
        let svc = service();
        let id = cast(&svc, "ann", Kind::Normal);

        // pin a stored effect; fishing must surface it, never re-roll it
        svc.db()
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE bottles SET bless_curse = 'curse' WHERE id = ?1",
                    [id],
                )?;
                Ok(())
            })
            .unwrap();

        let fished = svc.fish("bob").unwrap();
        assert_eq!(fished.bottle.bless_curse, BlessCurse::Curse);
        assert_eq!(fished.bottle.name_recv, "bob · letter [curse]");
        assert_eq!(fished.bottle.last_holder.as_deref(), Some("bob"));
    }

    #[test]
    fn list_filters_by_area_newest_first() {
        let svc = service();
        let a = cast(&svc, "ann", Kind::Normal);
        let b = cast(&svc, "bob", Kind::Normal);

        let main = svc.list(Some(Area::Main), None, 50, 0).unwrap();
        assert_eq!(main.iter().map(|b| b.id).collect::<Vec<_>>(), vec![b, a]);

        let anns = svc.list(None, Some("ann"), 50, 0).unwrap();
        assert_eq!(anns.len(), 1);

        assert!(svc.list(Some(Area::Memorial), None, 50, 0).unwrap().is_empty());
    }
}
