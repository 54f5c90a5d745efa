//! Core value types exchanged between players and a game session.
//!
//! Everything here is plain data: cheap to copy or clone, serializable,
//! and free of any locking or async concerns. The session engine builds
//! these; the connection layer encodes them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// One of the five game choices.
///
/// "No move yet" is not a variant: a pending move is an `Option<Move>`,
/// so the rules in [`Move::resolve`] can never be asked about a missing
/// move.
///
/// On the wire a move is `{"id":1,"name":"rock"}`. Clients may also send
/// just the name (`"rock"`) or just the id (`1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
    Lizard,
    Spock,
}

impl Move {
    /// All five moves in wire-id order.
    pub const ALL: [Move; 5] = [
        Move::Rock,
        Move::Paper,
        Move::Scissors,
        Move::Lizard,
        Move::Spock,
    ];

    /// The wire id (1..=5).
    pub fn id(self) -> u8 {
        match self {
            Self::Rock => 1,
            Self::Paper => 2,
            Self::Scissors => 3,
            Self::Lizard => 4,
            Self::Spock => 5,
        }
    }

    /// The lowercase wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rock => "rock",
            Self::Paper => "paper",
            Self::Scissors => "scissors",
            Self::Lizard => "lizard",
            Self::Spock => "spock",
        }
    }

    /// Looks a move up by its wire id.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMove`] for anything outside 1..=5.
    pub fn from_id(id: i64) -> Result<Self, ProtocolError> {
        Self::ALL
            .into_iter()
            .find(|m| i64::from(m.id()) == id)
            .ok_or_else(|| ProtocolError::InvalidMove(format!("id {id}")))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Move {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| ProtocolError::InvalidMove(s.to_string()))
    }
}

#[derive(Serialize)]
struct MoveObject {
    id: u8,
    name: &'static str,
}

/// Every shape a client is allowed to send a move in.
#[derive(Deserialize)]
#[serde(untagged)]
enum MoveWire {
    Object { id: i64 },
    Name(String),
    Id(i64),
}

impl Serialize for Move {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        MoveObject {
            id: self.id(),
            name: self.name(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Move {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parsed = match MoveWire::deserialize(deserializer)? {
            MoveWire::Object { id } | MoveWire::Id(id) => Move::from_id(id),
            MoveWire::Name(name) => name.parse(),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The result of a round, always from one side's point of view.
///
/// `Unknown` is a real wire value: it is what players see while the round
/// is still open or while they are alone in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
    Tie,
    Unknown,
}

impl Outcome {
    /// The same outcome seen from the other side of the table.
    ///
    /// Win and Lose swap; Tie and Unknown are their own inverse.
    pub fn inverse(self) -> Self {
        match self {
            Self::Win => Self::Lose,
            Self::Lose => Self::Win,
            other => other,
        }
    }

    /// The lowercase wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Lose => "lose",
            Self::Tie => "tie",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Outcome {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Win, Self::Lose, Self::Tie, Self::Unknown]
            .into_iter()
            .find(|o| o.name() == s)
            .ok_or_else(|| ProtocolError::InvalidOutcome(s.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OutcomeWire {
    Name(String),
    Id(i64),
}

impl<'de> Deserialize<'de> for Outcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parsed = match OutcomeWire::deserialize(deserializer)? {
            OutcomeWire::Name(name) => name.parse(),
            // Numeric outcomes only cover resolved rounds.
            OutcomeWire::Id(0) => Ok(Self::Win),
            OutcomeWire::Id(1) => Ok(Self::Lose),
            OutcomeWire::Id(2) => Ok(Self::Tie),
            OutcomeWire::Id(id) => Err(ProtocolError::InvalidOutcome(format!("id {id}"))),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Which of the two seats in a session a player occupies.
///
/// The first player to join sits on the left; the second on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both seats, left first.
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// The seat across the table.
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Opaque 64-bit session handle.
///
/// Its text form is always exactly 16 lowercase hex digits, zero-padded,
/// so it can be pasted into a join URL and parsed back unambiguously.
/// JSON carries the text form, not the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(pub u64);

impl SessionId {
    /// Length of the textual form.
    pub const TEXT_LEN: usize = 16;
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // `from_str_radix` tolerates a leading '+', so check the digits
        // ourselves before handing over.
        if s.len() != Self::TEXT_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ProtocolError::InvalidSessionId(s.to_string()));
        }
        u64::from_str_radix(s, 16)
            .map(SessionId)
            .map_err(|_| ProtocolError::InvalidSessionId(s.to_string()))
    }
}

impl TryFrom<String> for SessionId {
    type Error = ProtocolError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.to_string()
    }
}

// ---------------------------------------------------------------------------
// StateMessage
// ---------------------------------------------------------------------------

/// A snapshot of a session pushed to one player.
///
/// Built once per broadcast from the left player's perspective, then
/// turned into each recipient's copy with [`StateMessage::view_for`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMessage {
    /// Name of the left player, empty if the seat is free.
    #[serde(rename = "left_player_name")]
    pub left_name: String,
    /// Name of the right player, empty if the seat is free.
    #[serde(rename = "right_player_name")]
    pub right_name: String,
    #[serde(rename = "left_player_choice")]
    pub left_move: Option<Move>,
    #[serde(rename = "right_player_choice")]
    pub right_move: Option<Move>,
    /// Outcome from the recipient's point of view.
    #[serde(rename = "result")]
    pub outcome: Outcome,
}

impl StateMessage {
    /// Returns the copy of this snapshot that `side` is allowed to see.
    ///
    /// The opponent's move stays hidden until both moves are in, so
    /// nobody can wait for the other side and counter it. The right side
    /// also gets the outcome flipped to its own perspective.
    pub fn view_for(&self, side: Side) -> StateMessage {
        let mut view = self.clone();
        if view.left_move.is_none() || view.right_move.is_none() {
            match side {
                Side::Left => view.right_move = None,
                Side::Right => view.left_move = None,
            }
        }
        if side == Side::Right {
            view.outcome = view.outcome.inverse();
        }
        view
    }

    /// Name of the player sitting at `side`.
    pub fn name(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left_name,
            Side::Right => &self.right_name,
        }
    }

    /// Move shown for `side` in this message.
    pub fn move_of(&self, side: Side) -> Option<Move> {
        match side {
            Side::Left => self.left_move,
            Side::Right => self.right_move,
        }
    }
}
