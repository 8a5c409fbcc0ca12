pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::{CliConfig, Command};

pub use crate::adapters::{JsonFileStore, MemoryStore};
pub use crate::config::FarmConfig;
pub use crate::core::allocator::Allocator;
pub use crate::domain::model::{
    Animal, AnimalId, Barn, BarnId, BarnOccupancy, Color, NewAnimal, Placement, BARN_CAPACITY,
};
pub use crate::domain::ports::{AnimalStore, BarnStore};
pub use crate::utils::error::{FarmError, Result};
