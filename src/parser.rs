use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::round::{CardCount, Face, Hand, Round, Suit, Winner};

pub const ROUND_MARKER: &str = "#N";
pub const TOTAL_MARKER: &str = "#T";
pub const WIN_MARKER: char = '✅';
pub const TIE_MARKER: char = '🔰';
pub const DRAW_MARKER: char = '🟣';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Matched(Round),
    Unmatched,
}

impl ParseOutcome {
    pub fn into_round(self) -> Option<Round> {
        match self {
            ParseOutcome::Matched(round) => Some(round),
            ParseOutcome::Unmatched => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Win,
    Tie,
    Draw,
}

impl Marker {
    fn from_char(ch: char) -> Option<Self> {
        match ch {
            WIN_MARKER => Some(Marker::Win),
            TIE_MARKER => Some(Marker::Tie),
            DRAW_MARKER => Some(Marker::Draw),
            _ => None,
        }
    }
}

/// Raw slices pulled out of a record before any interpretation.
#[derive(Debug, Clone, Copy)]
struct Capture<'t> {
    number: &'t str,
    player_marker: Option<Marker>,
    player_score: &'t str,
    player_cards: &'t str,
    banker_marker: Option<Marker>,
    banker_score: &'t str,
    banker_cards: &'t str,
    total: &'t str,
}

trait RecordMatcher: Sync {
    fn name(&self) -> &'static str;

    fn applies(&self, _text: &str) -> bool {
        true
    }

    /// Tries a match anchored at `start`, which points at a round marker.
    fn capture_at<'t>(&self, text: &'t str, start: usize) -> Option<Capture<'t>>;

    fn capture<'t>(&self, text: &'t str) -> Option<Capture<'t>> {
        text.match_indices(ROUND_MARKER)
            .find_map(|(start, _)| self.capture_at(text, start))
    }
}

/// `#N<n>` `[. ]*` `[marker]` `<score>(<cards>)` `- | 🔰` `[marker]` `<score>(<cards>)` `#T<total>`
struct StrictMatcher;

impl RecordMatcher for StrictMatcher {
    fn name(&self) -> &'static str {
        "strict"
    }

    fn capture_at<'t>(&self, text: &'t str, start: usize) -> Option<Capture<'t>> {
        let mut c = Cursor::at(text, start);
        c.eat(ROUND_MARKER).then_some(())?;
        let number = c.digits()?;
        c.skip_while(|ch| ch == '.' || ch.is_whitespace());
        let player_marker = c.marker();
        c.skip_ws();
        let player_score = c.digits()?;
        let player_cards = c.hand()?;
        c.skip_ws();
        if !c.eat("-") && !c.eat_char(TIE_MARKER) {
            return None;
        }
        c.skip_ws();
        let banker_marker = c.marker();
        c.skip_ws();
        let banker_score = c.digits()?;
        let banker_cards = c.hand()?;
        c.skip_ws();
        c.eat(TOTAL_MARKER).then_some(())?;
        let total = c.digits()?;
        Some(Capture {
            number,
            player_marker,
            player_score,
            player_cards,
            banker_marker,
            banker_score,
            banker_cards,
            total,
        })
    }
}

/// Looser layout only tried when the tie marker is present: anything may sit between the
/// two hands and before the total.
struct TieFallbackMatcher;

impl RecordMatcher for TieFallbackMatcher {
    fn name(&self) -> &'static str {
        "tie-fallback"
    }

    fn applies(&self, text: &str) -> bool {
        text.contains(TIE_MARKER)
    }

    fn capture_at<'t>(&self, text: &'t str, start: usize) -> Option<Capture<'t>> {
        let mut c = Cursor::at(text, start);
        c.eat(ROUND_MARKER).then_some(())?;
        let number = c.digits()?;
        c.skip_while(|ch| ch == '.' || ch == ',' || ch.is_whitespace());
        let player_score = c.digits()?;
        let player_cards = c.hand()?;
        let (banker_score, banker_cards) = c.seek_scored_hand()?;
        let total = c.seek_total()?;
        Some(Capture {
            number,
            player_marker: None,
            player_score,
            player_cards,
            banker_marker: None,
            banker_score,
            banker_cards,
            total,
        })
    }
}

static MATCHERS: [&dyn RecordMatcher; 2] = [&StrictMatcher, &TieFallbackMatcher];

struct Cursor<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn at(text: &'t str, pos: usize) -> Self {
        Self { text, pos }
    }

    fn rest(&self) -> &'t str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, lit: &str) -> bool {
        if self.rest().starts_with(lit) {
            self.pos += lit.len();
            true
        } else {
            false
        }
    }

    fn eat_char(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn skip_ws(&mut self) {
        self.skip_while(char::is_whitespace);
    }

    fn digits(&mut self) -> Option<&'t str> {
        let start = self.pos;
        self.skip_while(|ch| ch.is_ascii_digit());
        (self.pos > start).then(|| &self.text[start..self.pos])
    }

    fn marker(&mut self) -> Option<Marker> {
        let marker = self.peek().and_then(Marker::from_char)?;
        self.pos += self.peek().map(char::len_utf8).unwrap_or(0);
        Some(marker)
    }

    /// `(` one or more non-`)` chars `)`, returning the inside.
    fn hand(&mut self) -> Option<&'t str> {
        let save = self.pos;
        if !self.eat_char('(') {
            return None;
        }
        let inner_start = self.pos;
        let Some(len) = self.rest().find(')') else {
            self.pos = save;
            return None;
        };
        if len == 0 {
            self.pos = save;
            return None;
        }
        let inner = &self.text[inner_start..inner_start + len];
        self.pos = inner_start + len + 1;
        Some(inner)
    }

    /// Earliest `<digits>(<cards>)` at or after the cursor.
    fn seek_scored_hand(&mut self) -> Option<(&'t str, &'t str)> {
        while self.pos < self.text.len() {
            match self.peek() {
                Some(ch) if ch.is_ascii_digit() => {
                    let save = self.pos;
                    let score = self.digits()?;
                    if let Some(cards) = self.hand() {
                        return Some((score, cards));
                    }
                    // A digit run not followed by a hand; resume right after it.
                    if self.pos == save {
                        self.pos += 1;
                    }
                }
                Some(ch) => self.pos += ch.len_utf8(),
                None => break,
            }
        }
        None
    }

    /// Earliest total marker followed by at least one digit.
    fn seek_total(&mut self) -> Option<&'t str> {
        while let Some(offset) = self.rest().find(TOTAL_MARKER) {
            self.pos += offset + TOTAL_MARKER.len();
            if let Some(total) = self.digits() {
                return Some(total);
            }
        }
        None
    }
}

/// Parses one raw record. Malformed records come back as `Unmatched`.
pub fn parse_round(text: &str) -> ParseOutcome {
    for matcher in MATCHERS.iter() {
        if !matcher.applies(text) {
            continue;
        }
        let Some(capture) = matcher.capture(text) else {
            continue;
        };
        return match build_round(text, capture) {
            Some(round) => ParseOutcome::Matched(round),
            None => {
                trace!(matcher = matcher.name(), "record matched but failed validation");
                ParseOutcome::Unmatched
            }
        };
    }
    ParseOutcome::Unmatched
}

fn build_round(text: &str, cap: Capture<'_>) -> Option<Round> {
    let number = cap.number.parse::<u32>().ok().filter(|n| *n > 0)?;
    let player_score = cap.player_score.parse::<u8>().ok()?;
    let banker_score = cap.banker_score.parse::<u8>().ok()?;
    let total = cap.total.parse::<u32>().ok()?;

    let winner = resolve_winner(text, &cap, player_score, banker_score);
    let player = analyze_hand(player_score, cap.player_cards)?;
    let banker = analyze_hand(banker_score, cap.banker_cards)?;

    Some(Round {
        number,
        winner,
        total,
        player,
        banker,
    })
}

fn resolve_winner(text: &str, cap: &Capture<'_>, player_score: u8, banker_score: u8) -> Winner {
    // The tie marker wins over everything, wherever it sits in the record.
    if text.contains(TIE_MARKER) {
        return Winner::Tie;
    }
    if cap.player_marker == Some(Marker::Win) {
        return Winner::Player;
    }
    if cap.banker_marker == Some(Marker::Win) {
        return Winner::Banker;
    }
    let draw_marked = matches!(cap.player_marker, Some(Marker::Draw | Marker::Tie))
        || matches!(cap.banker_marker, Some(Marker::Draw | Marker::Tie));
    if draw_marked || player_score == banker_score {
        Winner::Tie
    } else if player_score > banker_score {
        Winner::Player
    } else {
        Winner::Banker
    }
}

/// One suit symbol per physical card; a face letter counts only when a suit symbol follows it.
fn analyze_hand(score: u8, cards: &str) -> Option<Hand> {
    let mut present = BTreeSet::new();
    let mut faces = BTreeSet::new();
    let mut face_suits = BTreeSet::new();
    let mut count = 0usize;
    let mut prev: Option<char> = None;

    for ch in cards.chars() {
        if let Some(suit) = Suit::from_symbol(ch) {
            count += 1;
            present.insert(suit);
            if let Some(face) = prev.and_then(Face::from_letter) {
                faces.insert(face);
                face_suits.insert((face, suit));
            }
        }
        prev = Some(ch);
    }

    let card_count = CardCount::from_count(count)?;
    let missing_suits = Suit::ALL
        .iter()
        .copied()
        .filter(|s| !present.contains(s))
        .collect();

    Some(Hand {
        score,
        card_count,
        missing_suits,
        faces,
        face_suits,
    })
}

/// Parses a batch of records, dropping malformed ones. Repeated round numbers keep the last
/// record seen; the result is ordered by round number.
pub fn parse_records<I, S>(records: I) -> Vec<Round>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut by_number: BTreeMap<u32, Round> = BTreeMap::new();
    let mut dropped = 0usize;
    for record in records {
        match parse_round(record.as_ref()) {
            ParseOutcome::Matched(round) => {
                by_number.insert(round.number, round);
            }
            ParseOutcome::Unmatched => dropped += 1,
        }
    }
    if dropped > 0 {
        trace!(dropped, kept = by_number.len(), "dropped malformed records");
    }
    by_number.into_values().collect()
}

/// Splits a raw dump into records: each line holding a round marker opens a new record that
/// runs until the next such line. Lines before the first marker are ignored.
pub fn split_records(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut current: Option<String> = None;
    for line in raw.lines() {
        if line.contains(ROUND_MARKER) {
            if let Some(done) = current.take() {
                out.push(done);
            }
            current = Some(line.to_string());
        } else if let Some(buf) = current.as_mut() {
            buf.push('\n');
            buf.push_str(line);
        }
    }
    if let Some(done) = current {
        out.push(done);
    }
    out
}
