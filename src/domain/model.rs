use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::FarmError;

/// Animals a single barn may hold.
pub const BARN_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimalId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BarnId(pub u64);

impl fmt::Display for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BarnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Favorite color of an animal. Each color is an independent allocation domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Indigo,
    Violet,
}

impl Color {
    pub const ALL: [Color; 7] = [
        Color::Red,
        Color::Orange,
        Color::Yellow,
        Color::Green,
        Color::Blue,
        Color::Indigo,
        Color::Violet,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "RED",
            Color::Orange => "ORANGE",
            Color::Yellow => "YELLOW",
            Color::Green => "GREEN",
            Color::Blue => "BLUE",
            Color::Indigo => "INDIGO",
            Color::Violet => "VIOLET",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Color {
    type Err = FarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Color::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FarmError::ValidationError {
                message: format!("Unknown color '{}'", s),
            })
    }
}

/// Where an animal currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "barn", rename_all = "snake_case")]
pub enum Placement {
    Assigned(BarnId),
    #[default]
    Unassigned,
}

impl Placement {
    pub fn barn(self) -> Option<BarnId> {
        match self {
            Placement::Assigned(id) => Some(id),
            Placement::Unassigned => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animal {
    pub id: AnimalId,
    pub name: String,
    pub favorite_color: Color,
    #[serde(default)]
    pub placement: Placement,
    pub admitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnimal {
    pub name: String,
    pub favorite_color: Color,
}

impl NewAnimal {
    pub fn new(name: impl Into<String>, favorite_color: Color) -> Self {
        Self {
            name: name.into(),
            favorite_color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barn {
    pub id: BarnId,
    pub name: String,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBarn {
    pub name: String,
    pub color: Color,
}

/// Snapshot of one barn's population, read from the allocator's index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarnOccupancy {
    pub id: BarnId,
    pub name: String,
    pub color: Color,
    pub members: usize,
}
