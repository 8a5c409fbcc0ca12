use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::adapters::tables::{FarmFile, FarmTables};
use crate::domain::model::{Animal, AnimalId, Barn, BarnId, NewAnimal, NewBarn};
use crate::domain::ports::{AnimalStore, BarnStore};
use crate::utils::error::Result;

/// Farm tables persisted as one JSON document. The file is rewritten after
/// every write; a missing file is an empty farm.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    tables: RwLock<FarmTables>,
}

impl JsonFileStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = match tokio::fs::read(&path).await {
            Ok(bytes) => FarmTables::from(serde_json::from_slice::<FarmFile>(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No data file at {}, starting empty", path.display());
                FarmTables::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            tables: RwLock::new(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, tables: &FarmTables) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(&FarmFile::from(tables))?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Applies `change` to a copy of the tables and swaps the copy in only
    /// once it is on disk, so a failed write leaves the store unchanged.
    async fn transact<T>(&self, change: impl FnOnce(&mut FarmTables) -> Result<T>) -> Result<T> {
        let mut tables = self.tables.write().await;
        let mut next = tables.clone();
        let outcome = change(&mut next)?;
        self.persist(&next).await?;
        *tables = next;
        Ok(outcome)
    }
}

#[async_trait]
impl AnimalStore for JsonFileStore {
    async fn find_all(&self) -> Result<Vec<Animal>> {
        Ok(self.tables.read().await.animals())
    }

    async fn get_by_id(&self, id: AnimalId) -> Result<Animal> {
        self.tables.read().await.animal(id)
    }

    async fn create(&self, animal: NewAnimal) -> Result<Animal> {
        self.transact(|tables| Ok(tables.create_animal(animal))).await
    }

    async fn save(&self, animal: &Animal) -> Result<Animal> {
        self.transact(|tables| Ok(tables.upsert_animal(animal.clone())))
            .await
    }

    async fn save_all(&self, animals: &[Animal]) -> Result<Vec<Animal>> {
        self.transact(|tables| {
            Ok(animals
                .iter()
                .map(|a| tables.upsert_animal(a.clone()))
                .collect())
        })
        .await
    }

    async fn delete(&self, id: AnimalId) -> Result<()> {
        self.transact(|tables| tables.delete_animal(id)).await
    }

    async fn delete_all(&self) -> Result<()> {
        self.transact(|tables| {
            tables.clear_animals();
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl BarnStore for JsonFileStore {
    async fn find_all(&self) -> Result<Vec<Barn>> {
        Ok(self.tables.read().await.barns())
    }

    async fn create(&self, barn: NewBarn) -> Result<Barn> {
        self.transact(|tables| Ok(tables.create_barn(barn))).await
    }

    async fn save(&self, barn: &Barn) -> Result<Barn> {
        self.transact(|tables| Ok(tables.upsert_barn(barn.clone()))).await
    }

    async fn delete(&self, id: BarnId) -> Result<()> {
        self.transact(|tables| tables.delete_barn(id)).await
    }

    async fn delete_all(&self) -> Result<()> {
        self.transact(|tables| {
            tables.clear_barns();
            Ok(())
        })
        .await
    }
}
