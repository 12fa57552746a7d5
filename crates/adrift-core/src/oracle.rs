//! Bless/curse oracle. Probabilities derive from the author's morality at
//! creation time (post-delta); the draw happens exactly once and the stored
//! result is only re-labeled on later fishes, never re-rolled.

use rand::Rng;

use adrift_types::BlessCurse;

/// Bless probability in percent for a given morality.
pub fn bless_chance(m: i64) -> i64 {
    if m >= 20 {
        (m - 19).clamp(0, 100)
    } else if m >= 0 {
        (2 * m).clamp(0, 100)
    } else {
        0
    }
}

/// Curse probability in percent for a given morality.
pub fn curse_chance(m: i64) -> i64 {
    if m <= -20 {
        (3 * (m.abs() - 19)).clamp(0, 100)
    } else if m < 0 {
        (2 * m.abs()).clamp(0, 100)
    } else {
        0
    }
}

/// Pure decision given a uniform roll in [0, 100). Curse wins the low band,
/// bless the next, the rest is none.
pub fn decide(morality: i64, roll: i64) -> BlessCurse {
    let curse = curse_chance(morality);
    let bless = bless_chance(morality);
    if roll < curse {
        BlessCurse::Curse
    } else if roll < curse + bless {
        BlessCurse::Bless
    } else {
        BlessCurse::None
    }
}

/// Production path: draw the roll and decide.
pub fn draw(morality: i64) -> BlessCurse {
    let roll = rand::rng().random_range(0..100);
    decide(morality, roll)
}
