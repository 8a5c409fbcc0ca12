//! In-memory store implementation

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::adapters::tables::FarmTables;
use crate::domain::model::{Animal, AnimalId, Barn, BarnId, NewAnimal, NewBarn};
use crate::domain::ports::{AnimalStore, BarnStore};
use crate::utils::error::Result;

/// Animal and barn tables kept in memory. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<FarmTables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnimalStore for MemoryStore {
    async fn find_all(&self) -> Result<Vec<Animal>> {
        Ok(self.tables.read().await.animals())
    }

    async fn get_by_id(&self, id: AnimalId) -> Result<Animal> {
        self.tables.read().await.animal(id)
    }

    async fn create(&self, animal: NewAnimal) -> Result<Animal> {
        Ok(self.tables.write().await.create_animal(animal))
    }

    async fn save(&self, animal: &Animal) -> Result<Animal> {
        Ok(self.tables.write().await.upsert_animal(animal.clone()))
    }

    async fn save_all(&self, animals: &[Animal]) -> Result<Vec<Animal>> {
        let mut tables = self.tables.write().await;
        Ok(animals
            .iter()
            .map(|a| tables.upsert_animal(a.clone()))
            .collect())
    }

    async fn delete(&self, id: AnimalId) -> Result<()> {
        self.tables.write().await.delete_animal(id)
    }

    async fn delete_all(&self) -> Result<()> {
        self.tables.write().await.clear_animals();
        Ok(())
    }
}

#[async_trait]
impl BarnStore for MemoryStore {
    async fn find_all(&self) -> Result<Vec<Barn>> {
        Ok(self.tables.read().await.barns())
    }

    async fn create(&self, barn: NewBarn) -> Result<Barn> {
        Ok(self.tables.write().await.create_barn(barn))
    }

    async fn save(&self, barn: &Barn) -> Result<Barn> {
        Ok(self.tables.write().await.upsert_barn(barn.clone()))
    }

    async fn delete(&self, id: BarnId) -> Result<()> {
        self.tables.write().await.delete_barn(id)
    }

    async fn delete_all(&self) -> Result<()> {
        self.tables.write().await.clear_barns();
        Ok(())
    }
}
