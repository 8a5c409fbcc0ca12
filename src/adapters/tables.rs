use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::model::{Animal, AnimalId, Barn, BarnId, NewAnimal, NewBarn, Placement};
use crate::utils::error::{FarmError, Result};

/// Row storage shared by the in-memory and file-backed stores.
#[derive(Debug, Clone, Default)]
pub struct FarmTables {
    next_animal_id: u64,
    next_barn_id: u64,
    animals: BTreeMap<AnimalId, Animal>,
    barns: BTreeMap<BarnId, Barn>,
}

/// On-disk layout of [`FarmTables`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FarmFile {
    #[serde(default)]
    pub next_animal_id: u64,
    #[serde(default)]
    pub next_barn_id: u64,
    #[serde(default)]
    pub animals: Vec<Animal>,
    #[serde(default)]
    pub barns: Vec<Barn>,
}

impl From<FarmFile> for FarmTables {
    fn from(file: FarmFile) -> Self {
        let mut tables = FarmTables {
            next_animal_id: file.next_animal_id,
            next_barn_id: file.next_barn_id,
            ..Default::default()
        };
        for animal in file.animals {
            tables.upsert_animal(animal);
        }
        for barn in file.barns {
            tables.upsert_barn(barn);
        }
        tables
    }
}

impl From<&FarmTables> for FarmFile {
    fn from(tables: &FarmTables) -> Self {
        FarmFile {
            next_animal_id: tables.next_animal_id,
            next_barn_id: tables.next_barn_id,
            animals: tables.animals.values().cloned().collect(),
            barns: tables.barns.values().cloned().collect(),
        }
    }
}

impl FarmTables {
    pub fn animals(&self) -> Vec<Animal> {
        self.animals.values().cloned().collect()
    }

    pub fn animal(&self, id: AnimalId) -> Result<Animal> {
        self.animals
            .get(&id)
            .cloned()
            .ok_or_else(|| FarmError::not_found_animal(id.0))
    }

    pub fn create_animal(&mut self, animal: NewAnimal) -> Animal {
        self.next_animal_id += 1;
        let created = Animal {
            id: AnimalId(self.next_animal_id),
            name: animal.name,
            favorite_color: animal.favorite_color,
            placement: Placement::Unassigned,
            admitted_at: Utc::now(),
        };
        self.animals.insert(created.id, created.clone());
        created
    }

    pub fn upsert_animal(&mut self, animal: Animal) -> Animal {
        self.next_animal_id = self.next_animal_id.max(animal.id.0);
        self.animals.insert(animal.id, animal.clone());
        animal
    }

    pub fn delete_animal(&mut self, id: AnimalId) -> Result<()> {
        self.animals
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| FarmError::not_found_animal(id.0))
    }

    pub fn clear_animals(&mut self) {
        self.animals.clear();
    }

    pub fn barns(&self) -> Vec<Barn> {
        self.barns.values().cloned().collect()
    }

    pub fn create_barn(&mut self, barn: NewBarn) -> Barn {
        self.next_barn_id += 1;
        let created = Barn {
            id: BarnId(self.next_barn_id),
            name: barn.name,
            color: barn.color,
        };
        self.barns.insert(created.id, created.clone());
        created
    }

    pub fn upsert_barn(&mut self, barn: Barn) -> Barn {
        self.next_barn_id = self.next_barn_id.max(barn.id.0);
        self.barns.insert(barn.id, barn.clone());
        barn
    }

    pub fn delete_barn(&mut self, id: BarnId) -> Result<()> {
        self.barns
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| FarmError::not_found_barn(id.0))
    }

    pub fn clear_barns(&mut self) {
        self.barns.clear();
    }
}
