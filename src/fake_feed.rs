use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::parser::{TIE_MARKER, WIN_MARKER};
use crate::round::{Suit, Winner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    // 1 = ace, 11..=13 = jack, queen, king.
    pub rank: u8,
    pub suit: Suit,
}

impl Card {
    pub fn points(self) -> u8 {
        match self.rank {
            1..=9 => self.rank,
            _ => 0,
        }
    }

    pub fn text(self) -> String {
        let rank = match self.rank {
            1 => "A".to_string(),
            11 => "J".to_string(),
            12 => "Q".to_string(),
            13 => "K".to_string(),
            n => n.to_string(),
        };
        format!("{rank}{}\u{fe0f}", self.suit.symbol())
    }
}

pub fn hand_score(cards: &[Card]) -> u8 {
    cards.iter().map(|c| c.points() as u32).sum::<u32>() as u8 % 10
}

#[derive(Debug, Clone)]
pub struct DealtRound {
    pub number: u32,
    pub player: Vec<Card>,
    pub banker: Vec<Card>,
}

impl DealtRound {
    pub fn player_score(&self) -> u8 {
        hand_score(&self.player)
    }

    pub fn banker_score(&self) -> u8 {
        hand_score(&self.banker)
    }

    pub fn winner(&self) -> Winner {
        let (p, b) = (self.player_score(), self.banker_score());
        if p > b {
            Winner::Player
        } else if b > p {
            Winner::Banker
        } else {
            Winner::Tie
        }
    }

    pub fn total(&self) -> u32 {
        self.player_score() as u32 + self.banker_score() as u32
    }

    pub fn record_text(&self) -> String {
        record_text(self.number, &self.player, &self.banker)
    }
}

/// Renders a record the way the channel posts them.
pub fn record_text(number: u32, player: &[Card], banker: &[Card]) -> String {
    let ps = hand_score(player);
    let bs = hand_score(banker);
    let cards = |hand: &[Card]| hand.iter().map(|c| c.text()).collect::<String>();
    let total = ps as u32 + bs as u32;
    if ps == bs {
        format!(
            "#N{number}. {ps}({}) {TIE_MARKER} {bs}({}) #T{total}",
            cards(player),
            cards(banker)
        )
    } else if ps > bs {
        format!(
            "#N{number}. {WIN_MARKER}{ps}({}) - {bs}({}) #T{total}",
            cards(player),
            cards(banker)
        )
    } else {
        format!(
            "#N{number}. {ps}({}) - {WIN_MARKER}{bs}({}) #T{total}",
            cards(player),
            cards(banker)
        )
    }
}

fn draw(rng: &mut impl Rng) -> Card {
    Card {
        rank: rng.gen_range(1..=13),
        suit: Suit::ALL[rng.gen_range(0..Suit::ALL.len())],
    }
}

/// Deals from an endless shoe. Each side takes a third card on five or less.
pub fn deal_round(rng: &mut impl Rng, number: u32) -> DealtRound {
    let mut player = vec![draw(rng), draw(rng)];
    let mut banker = vec![draw(rng), draw(rng)];
    if hand_score(&player) <= 5 {
        player.push(draw(rng));
    }
    if hand_score(&banker) <= 5 {
        banker.push(draw(rng));
    }
    DealtRound {
        number,
        player,
        banker,
    }
}

/// `count` consecutive records starting at round `first`, reproducible from `seed`.
pub fn synthetic_rounds(count: usize, first: u32, seed: u64) -> Vec<DealtRound> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| deal_round(&mut rng, first + i as u32))
        .collect()
}

pub fn synthetic_records(count: usize, first: u32, seed: u64) -> Vec<String> {
    synthetic_rounds(count, first, seed)
        .iter()
        .map(DealtRound::record_text)
        .collect()
}
