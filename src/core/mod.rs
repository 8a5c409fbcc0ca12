pub mod allocator;
pub mod ledger;
pub mod plan;
pub mod unit_of_work;

pub use crate::domain::model::{Animal, AnimalId, Barn, BarnId, Color, NewAnimal, Placement};
pub use crate::domain::ports::{AnimalStore, BarnStore};
pub use crate::utils::error::Result;
