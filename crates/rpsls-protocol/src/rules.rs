//! Who beats whom.
//!
//! Each move beats exactly two others and loses to the remaining two:
//!
//! ```text
//! rock     crushes scissors, crushes lizard
//! paper    covers rock,      disproves spock
//! scissors cuts paper,       decapitates lizard
//! lizard   eats paper,       poisons spock
//! spock    vaporizes rock,   smashes scissors
//! ```

use crate::{Move, Outcome};

impl Move {
    /// Returns `true` if `self` defeats `other`.
    pub fn beats(self, other: Move) -> bool {
        use Move::*;
        matches!(
            (self, other),
            (Rock, Scissors | Lizard)
                | (Paper, Rock | Spock)
                | (Scissors, Paper | Lizard)
                | (Lizard, Paper | Spock)
                | (Spock, Rock | Scissors)
        )
    }

    /// Resolves a round from `self`'s point of view.
    ///
    /// Total over all move pairs; never returns [`Outcome::Unknown`].
    pub fn resolve(self, opponent: Move) -> Outcome {
        if self == opponent {
            Outcome::Tie
        } else if self.beats(opponent) {
            Outcome::Win
        } else {
            Outcome::Lose
        }
    }
}
