use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::round::{CardCount, Face, Parity, Round, ScoreBand, Side, StructureLabel, Suit, Winner};

/// A boolean predicate over rounds. Variant order is the facet order used for tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Victory(Winner),
    Parity(Parity),
    Structure(CardCount, CardCount),
    CardCount(Side, CardCount),
    ScoreBand(Side, ScoreBand),
    MissingSuit(Side, Suit),
    FaceCard(Side, Face),
    FaceSuit(Side, Face, Suit),
}

pub type CategoryMap = BTreeMap<Category, Vec<u32>>;

static BASE_CATALOG: Lazy<Vec<Category>> = Lazy::new(|| build_catalog(false));
static FULL_CATALOG: Lazy<Vec<Category>> = Lazy::new(|| build_catalog(true));

fn build_catalog(face_suits: bool) -> Vec<Category> {
    let mut out = Vec::new();
    out.extend(Winner::ALL.iter().map(|w| Category::Victory(*w)));
    out.extend(Parity::ALL.iter().map(|p| Category::Parity(*p)));
    for a in CardCount::ALL {
        for b in CardCount::ALL {
            out.push(Category::Structure(a, b));
        }
    }
    for side in Side::ALL {
        for count in CardCount::ALL {
            out.push(Category::CardCount(side, count));
        }
    }
    for side in Side::ALL {
        for band in ScoreBand::ALL {
            out.push(Category::ScoreBand(side, band));
        }
    }
    for side in Side::ALL {
        for suit in Suit::ALL {
            out.push(Category::MissingSuit(side, suit));
        }
    }
    for side in Side::ALL {
        for face in Face::ALL {
            out.push(Category::FaceCard(side, face));
        }
    }
    if face_suits {
        for side in Side::ALL {
            for face in Face::ALL {
                for suit in Suit::ALL {
                    out.push(Category::FaceSuit(side, face, suit));
                }
            }
        }
    }
    out
}

/// Every category, in facet order. The face×suit facet is appended only when requested.
pub fn catalog(include_face_suits: bool) -> &'static [Category] {
    if include_face_suits {
        &FULL_CATALOG
    } else {
        &BASE_CATALOG
    }
}

impl Category {
    pub fn holds(&self, round: &Round) -> bool {
        match *self {
            Category::Victory(w) => round.winner == w,
            Category::Parity(p) => round.parity() == p,
            Category::Structure(a, b) => round.structure() == (a, b),
            Category::CardCount(side, count) => round.hand(side).card_count == count,
            Category::ScoreBand(side, band) => round.score_band(side) == band,
            Category::MissingSuit(side, suit) => round.hand(side).missing_suits.contains(&suit),
            Category::FaceCard(side, face) => round.hand(side).faces.contains(&face),
            Category::FaceSuit(side, face, suit) => {
                round.hand(side).face_suits.contains(&(face, suit))
            }
        }
    }

    /// Rare outcomes are projected on their worst-case spacing instead of the blended average.
    pub fn is_rare(&self) -> bool {
        matches!(self, Category::Victory(Winner::Tie))
    }

    pub fn is_neutral_band(&self) -> bool {
        matches!(self, Category::ScoreBand(_, ScoreBand::Neutral))
    }

    pub fn label(&self) -> String {
        label(*self)
    }

    pub fn notation(&self) -> String {
        notation(*self)
    }
}

/// Display name, kept apart from the identity of the category.
pub fn label(category: Category) -> String {
    match category {
        Category::Victory(Winner::Player) => "Victory Player".to_string(),
        Category::Victory(Winner::Banker) => "Victory Banker".to_string(),
        Category::Victory(Winner::Tie) => "Tie".to_string(),
        Category::Parity(Parity::Even) => "Parity Even".to_string(),
        Category::Parity(Parity::Odd) => "Parity Odd".to_string(),
        Category::Structure(a, b) => format!("Structure {}", StructureLabel(a, b)),
        Category::CardCount(side, count) => format!("{} {} cards", side.label(), count.get()),
        Category::ScoreBand(side, ScoreBand::Over) => format!("{} Over 6.5", side.label()),
        Category::ScoreBand(side, ScoreBand::Under) => format!("{} Under 4.5", side.label()),
        Category::ScoreBand(side, ScoreBand::Neutral) => format!("{} Neutral", side.label()),
        Category::MissingSuit(side, suit) => format!("Missing {} {}", suit.symbol(), side.label()),
        Category::FaceCard(side, face) => format!("{} on {} side", face.name(), side.label()),
        Category::FaceSuit(side, face, suit) => {
            format!("{}{} on {} side", face.name(), suit.symbol(), side.label())
        }
    }
}

/// Short code used in compact listings.
pub fn notation(category: Category) -> String {
    match category {
        Category::Victory(Winner::Player) => "V1".to_string(),
        Category::Victory(Winner::Banker) => "V2".to_string(),
        Category::Victory(Winner::Tie) => "X".to_string(),
        Category::Parity(Parity::Even) => "EV".to_string(),
        Category::Parity(Parity::Odd) => "OD".to_string(),
        Category::Structure(a, b) => StructureLabel(a, b).to_string(),
        Category::CardCount(side, count) => format!("{}{}K", side.short(), count.get()),
        Category::ScoreBand(side, ScoreBand::Over) => format!("{}+", side.short()),
        Category::ScoreBand(side, ScoreBand::Under) => format!("{}-", side.short()),
        Category::ScoreBand(side, ScoreBand::Neutral) => format!("{}=", side.short()),
        Category::MissingSuit(side, suit) => format!("{} {}", side.short(), suit.symbol()),
        Category::FaceCard(side, face) => format!("{} val {}", side.short(), face.letter()),
        Category::FaceSuit(side, face, suit) => {
            format!("{} {}{}", side.short(), face.letter(), suit.symbol())
        }
    }
}

/// Buckets round numbers by category. Every catalog entry is present, possibly empty;
/// each list is ascending and free of duplicates.
pub fn build_categories(rounds: &[Round], include_face_suits: bool) -> CategoryMap {
    let cats = catalog(include_face_suits);
    let mut out: CategoryMap = cats.iter().map(|c| (*c, Vec::new())).collect();
    for round in rounds {
        for cat in cats {
            if cat.holds(round) {
                if let Some(nums) = out.get_mut(cat) {
                    nums.push(round.number);
                }
            }
        }
    }
    for nums in out.values_mut() {
        nums.sort_unstable();
        nums.dedup();
    }
    out
}
