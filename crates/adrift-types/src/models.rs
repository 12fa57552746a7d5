use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a bottle currently lives. `Memorial` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    Main,
    Temp,
    Memorial,
}

impl Area {
    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Main => "main",
            Area::Temp => "temp",
            Area::Memorial => "memorial",
        }
    }

    /// Legal lifecycle moves: main ⇄ temp (hold taken / returned), and either
    /// non-terminal area into memorial (5th reply lands while held, or the
    /// sweep finalizes an expired bottle sitting in main).
    pub fn can_transition(self, to: Area) -> bool {
        matches!(
            (self, to),
            (Area::Main, Area::Temp)
                | (Area::Temp, Area::Main)
                | (Area::Main, Area::Memorial)
                | (Area::Temp, Area::Memorial)
        )
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Area {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(Area::Main),
            "temp" => Ok(Area::Temp),
            "memorial" => Ok(Area::Memorial),
            other => Err(format!("unknown area '{other}'")),
        }
    }
}

/// Moral flavor of a bottle, declared by its author at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Good,
    Bad,
    Normal,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Good => "good",
            Kind::Bad => "bad",
            Kind::Normal => "normal",
        }
    }

    /// Morality delta the author earns for casting a bottle of this kind.
    pub fn cast_delta(&self) -> i64 {
        match self {
            Kind::Good => 1,
            Kind::Bad => -5,
            Kind::Normal => 0,
        }
    }

    /// Reversed delta applied when the author withdraws an unfished bottle.
    pub fn retrieve_delta(&self) -> i64 {
        match self {
            Kind::Good => -1,
            Kind::Bad => 5,
            Kind::Normal => 0,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(Kind::Good),
            "bad" => Ok(Kind::Bad),
            "normal" => Ok(Kind::Normal),
            other => Err(format!("unknown kind '{other}'")),
        }
    }
}

/// Effect rolled once at creation from the author's morality. Never re-rolled;
/// the fish path only re-labels it for the holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlessCurse {
    None,
    Bless,
    Curse,
}

impl BlessCurse {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlessCurse::None => "none",
            BlessCurse::Bless => "bless",
            BlessCurse::Curse => "curse",
        }
    }

    /// Label appended to `name_recv` when the bottle is fished.
    pub fn label(&self) -> &'static str {
        match self {
            BlessCurse::None => "",
            BlessCurse::Bless => " [bless]",
            BlessCurse::Curse => " [curse]",
        }
    }
}

impl fmt::Display for BlessCurse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlessCurse {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(BlessCurse::None),
            "bless" => Ok(BlessCurse::Bless),
            "curse" => Ok(BlessCurse::Curse),
            other => Err(format!("unknown bless_curse '{other}'")),
        }
    }
}

/// A cast message. All timestamps are Unix epoch seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bottle {
    pub id: i64,
    pub item_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: i64,
    pub kind: Kind,
    pub reply_count: u32,
    pub area: Area,
    #[serde(rename = "type")]
    pub tag: String,
    pub bless_curse: BlessCurse,
    pub name_send: String,
    pub name_recv: String,
    pub last_holder: Option<String>,
    pub expires_at: Option<i64>,
    pub origin_ip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: i64,
    pub bottle_id: i64,
    pub user: String,
    pub content: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memorial {
    pub id: i64,
    pub bottle_id: i64,
    pub participants: Vec<String>,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_transitions() {
        assert!(Area::Main.can_transition(Area::Temp));
        assert!(Area::Temp.can_transition(Area::Main));
        assert!(Area::Main.can_transition(Area::Memorial));
        assert!(Area::Temp.can_transition(Area::Memorial));

        // memorial is terminal
        assert!(!Area::Memorial.can_transition(Area::Main));
        assert!(!Area::Memorial.can_transition(Area::Temp));
        assert!(!Area::Main.can_transition(Area::Main));
    }

    #[test]
    fn kind_deltas_reverse() {
        for kind in [Kind::Good, Kind::Bad, Kind::Normal] {
            assert_eq!(kind.cast_delta(), -kind.retrieve_delta());
        }
    }

    #[test]
    fn enum_round_trips() {
        assert_eq!("memorial".parse::<Area>().unwrap(), Area::Memorial);
        assert_eq!("bad".parse::<Kind>().unwrap(), Kind::Bad);
        assert_eq!("bless".parse::<BlessCurse>().unwrap(), BlessCurse::Bless);
        assert!("drowned".parse::<Area>().is_err());
    }
}
