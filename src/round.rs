use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Player,
    Banker,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Player, Side::Banker];

    pub fn label(self) -> &'static str {
        match self {
            Side::Player => "Player",
            Side::Banker => "Banker",
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Side::Player => "P",
            Side::Banker => "B",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Winner {
    Player,
    Banker,
    Tie,
}

impl Winner {
    pub const ALL: [Winner; 3] = [Winner::Player, Winner::Banker, Winner::Tie];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    pub const ALL: [Parity; 2] = [Parity::Even, Parity::Odd];

    pub fn of(total: u32) -> Self {
        if total % 2 == 0 { Parity::Even } else { Parity::Odd }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn symbol(self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
        }
    }

    pub fn from_symbol(ch: char) -> Option<Self> {
        match ch {
            '♠' => Some(Suit::Spades),
            '♥' => Some(Suit::Hearts),
            '♦' => Some(Suit::Diamonds),
            '♣' => Some(Suit::Clubs),
            _ => None,
        }
    }

    /// Accepts symbols (with or without the emoji variation selector) and common names.
    pub fn from_alias(raw: &str) -> Option<Self> {
        let s = raw.trim().trim_end_matches('\u{fe0f}').to_lowercase();
        let mut chars = s.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            return Suit::from_symbol(ch);
        }
        match s.as_str() {
            "spade" | "spades" | "pique" => Some(Suit::Spades),
            "heart" | "hearts" | "coeur" | "cœur" => Some(Suit::Hearts),
            "diamond" | "diamonds" | "carreau" => Some(Suit::Diamonds),
            "club" | "clubs" | "trefle" | "trèfle" => Some(Suit::Clubs),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Face {
    Ace,
    King,
    Queen,
    Jack,
}

impl Face {
    pub const ALL: [Face; 4] = [Face::Ace, Face::King, Face::Queen, Face::Jack];

    pub fn letter(self) -> char {
        match self {
            Face::Ace => 'A',
            Face::King => 'K',
            Face::Queen => 'Q',
            Face::Jack => 'J',
        }
    }

    pub fn from_letter(ch: char) -> Option<Self> {
        match ch {
            'A' => Some(Face::Ace),
            'K' => Some(Face::King),
            'Q' => Some(Face::Queen),
            'J' => Some(Face::Jack),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Face::Ace => "Ace",
            Face::King => "King",
            Face::Queen => "Queen",
            Face::Jack => "Jack",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CardCount {
    Two,
    Three,
}

impl CardCount {
    pub const ALL: [CardCount; 2] = [CardCount::Two, CardCount::Three];

    pub fn from_count(n: usize) -> Option<Self> {
        match n {
            2 => Some(CardCount::Two),
            3 => Some(CardCount::Three),
            _ => None,
        }
    }

    pub fn get(self) -> u8 {
        match self {
            CardCount::Two => 2,
            CardCount::Three => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScoreBand {
    Over,
    Under,
    Neutral,
}

impl ScoreBand {
    pub const ALL: [ScoreBand; 3] = [ScoreBand::Over, ScoreBand::Under, ScoreBand::Neutral];

    pub fn of(score: u8) -> Self {
        if score >= 7 {
            ScoreBand::Over
        } else if score <= 4 {
            ScoreBand::Under
        } else {
            ScoreBand::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    pub score: u8,
    pub card_count: CardCount,
    pub missing_suits: BTreeSet<Suit>,
    pub faces: BTreeSet<Face>,
    // Face letters directly followed by a suit symbol.
    pub face_suits: BTreeSet<(Face, Suit)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub number: u32,
    pub winner: Winner,
    pub total: u32,
    pub player: Hand,
    pub banker: Hand,
}

impl Round {
    pub fn hand(&self, side: Side) -> &Hand {
        match side {
            Side::Player => &self.player,
            Side::Banker => &self.banker,
        }
    }

    pub fn parity(&self) -> Parity {
        Parity::of(self.total)
    }

    pub fn structure(&self) -> (CardCount, CardCount) {
        (self.player.card_count, self.banker.card_count)
    }

    pub fn score_band(&self, side: Side) -> ScoreBand {
        ScoreBand::of(self.hand(side).score)
    }
}

pub struct StructureLabel(pub CardCount, pub CardCount);

impl fmt::Display for StructureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0.get(), self.1.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_band_edges() {
        assert_eq!(ScoreBand::of(7), ScoreBand::Over);
        assert_eq!(ScoreBand::of(9), ScoreBand::Over);
        assert_eq!(ScoreBand::of(4), ScoreBand::Under);
        assert_eq!(ScoreBand::of(0), ScoreBand::Under);
        assert_eq!(ScoreBand::of(5), ScoreBand::Neutral);
        assert_eq!(ScoreBand::of(6), ScoreBand::Neutral);
    }

    #[test]
    fn suit_aliases_accept_emoji_and_names() {
        assert_eq!(Suit::from_alias("♠\u{fe0f}"), Some(Suit::Spades));
        assert_eq!(Suit::from_alias(" Coeur "), Some(Suit::Hearts));
        assert_eq!(Suit::from_alias("trèfle"), Some(Suit::Clubs));
        assert_eq!(Suit::from_alias("x"), None);
    }

    #[test]
    fn structure_label_formats_counts() {
        assert_eq!(
            StructureLabel(CardCount::Two, CardCount::Three).to_string(),
            "2/3"
        );
    }
}
