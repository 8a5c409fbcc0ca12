use crate::domain::model::{Animal, AnimalId, Barn, BarnId, NewAnimal, NewBarn};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait AnimalStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Animal>>;
    /// Fails with `FarmError::NotFound` when the id is unknown.
    async fn get_by_id(&self, id: AnimalId) -> Result<Animal>;
    /// Stores a new, unassigned animal and returns it with its id.
    async fn create(&self, animal: NewAnimal) -> Result<Animal>;
    /// Upserts by id.
    async fn save(&self, animal: &Animal) -> Result<Animal>;
    async fn save_all(&self, animals: &[Animal]) -> Result<Vec<Animal>>;
    async fn delete(&self, id: AnimalId) -> Result<()>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait BarnStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Barn>>;
    async fn create(&self, barn: NewBarn) -> Result<Barn>;
    /// Upserts by id.
    async fn save(&self, barn: &Barn) -> Result<Barn>;
    async fn delete(&self, id: BarnId) -> Result<()>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
impl<T: AnimalStore + ?Sized> AnimalStore for Arc<T> {
    async fn find_all(&self) -> Result<Vec<Animal>> {
        AnimalStore::find_all(&**self).await
    }

    async fn get_by_id(&self, id: AnimalId) -> Result<Animal> {
        AnimalStore::get_by_id(&**self, id).await
    }

    async fn create(&self, animal: NewAnimal) -> Result<Animal> {
        AnimalStore::create(&**self, animal).await
    }

    async fn save(&self, animal: &Animal) -> Result<Animal> {
        AnimalStore::save(&**self, animal).await
    }

    async fn save_all(&self, animals: &[Animal]) -> Result<Vec<Animal>> {
        AnimalStore::save_all(&**self, animals).await
    }

    async fn delete(&self, id: AnimalId) -> Result<()> {
        AnimalStore::delete(&**self, id).await
    }

    async fn delete_all(&self) -> Result<()> {
        AnimalStore::delete_all(&**self).await
    }
}

#[async_trait]
impl<T: BarnStore + ?Sized> BarnStore for Arc<T> {
    async fn find_all(&self) -> Result<Vec<Barn>> {
        BarnStore::find_all(&**self).await
    }

    async fn create(&self, barn: NewBarn) -> Result<Barn> {
        BarnStore::create(&**self, barn).await
    }

    async fn save(&self, barn: &Barn) -> Result<Barn> {
        BarnStore::save(&**self, barn).await
    }

    async fn delete(&self, id: BarnId) -> Result<()> {
        BarnStore::delete(&**self, id).await
    }

    async fn delete_all(&self) -> Result<()> {
        BarnStore::delete_all(&**self).await
    }
}
