#![allow(dead_code)]

use async_trait::async_trait;
use barn_allocator::{
    Animal, AnimalId, AnimalStore, Barn, BarnId, BarnStore, Color, FarmError, MemoryStore,
    NewAnimal, Placement, Result,
};
use barn_allocator::domain::model::NewBarn;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Writes barns of `color` straight into the store, one per entry of
/// `sizes`, bypassing the allocator. Returns the barn ids in order.
pub async fn seed(store: &MemoryStore, color: Color, sizes: &[usize]) -> Vec<BarnId> {
    let mut ids = Vec::new();
    for (ordinal, &size) in sizes.iter().enumerate() {
        let barn = BarnStore::create(
            store,
            NewBarn {
                name: format!("{}{}", color.name(), ordinal),
                color,
            },
        )
        .await
        .unwrap();

        for i in 0..size {
            let animal = AnimalStore::create(
                store,
                NewAnimal::new(format!("{}-{}-{}", color.name(), ordinal, i), color),
            )
            .await
            .unwrap();
            AnimalStore::save(
                store,
                &Animal {
                    placement: Placement::Assigned(barn.id),
                    ..animal
                },
            )
            .await
            .unwrap();
        }
        ids.push(barn.id);
    }
    ids
}

pub async fn members_of<S: AnimalStore>(store: &S, barn: BarnId) -> Vec<Animal> {
    let mut members: Vec<Animal> = store
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.placement == Placement::Assigned(barn))
        .collect();
    members.sort_by_key(|a| a.id);
    members
}

/// Barn populations per color as stored, ascending.
pub async fn stored_sizes<S: AnimalStore + BarnStore>(store: &S, color: Color) -> Vec<usize> {
    let barns = BarnStore::find_all(store).await.unwrap();
    let animals = AnimalStore::find_all(store).await.unwrap();
    let mut sizes: Vec<usize> = barns
        .iter()
        .filter(|b| b.color == color)
        .map(|b| {
            animals
                .iter()
                .filter(|a| a.placement == Placement::Assigned(b.id))
                .count()
        })
        .collect();
    sizes.sort();
    sizes
}

/// Capacity, color consistency, no orphan barns and no unassigned animals,
/// checked against what the stores hold.
pub async fn assert_farm_invariants<S: AnimalStore + BarnStore>(store: &S, capacity: usize) {
    let barns: HashMap<BarnId, Barn> = BarnStore::find_all(store)
        .await
        .unwrap()
        .into_iter()
        .map(|b| (b.id, b))
        .collect();
    let animals = AnimalStore::find_all(store).await.unwrap();

    let mut counts: HashMap<BarnId, usize> = HashMap::new();
    for animal in &animals {
        match animal.placement {
            Placement::Assigned(id) => {
                let barn = barns
                    .get(&id)
                    .unwrap_or_else(|| panic!("animal {} points at missing barn {}", animal.id, id));
                assert_eq!(barn.color, animal.favorite_color, "animal {}", animal.id);
                *counts.entry(id).or_default() += 1;
            }
            Placement::Unassigned => panic!("animal {} left unassigned", animal.id),
        }
    }

    for barn in barns.values() {
        let members = counts.get(&barn.id).copied().unwrap_or(0);
        assert!(members > 0, "barn {} is empty", barn.name);
        assert!(
            members <= capacity,
            "barn {} holds {} animals",
            barn.name,
            members
        );
    }
}

/// Memory store that fails selected writes once when armed.
#[derive(Debug, Clone, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_animal_create: Arc<AtomicBool>,
    pub fail_save_all: Arc<AtomicBool>,
    pub fail_barn_create: Arc<AtomicBool>,
    pub fail_barn_delete: Arc<AtomicBool>,
    pub fail_barn_delete_all: Arc<AtomicBool>,
}

impl FlakyStore {
    fn trip(flag: &AtomicBool) -> Result<()> {
        if flag.swap(false, Ordering::SeqCst) {
            return Err(FarmError::StoreError {
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AnimalStore for FlakyStore {
    async fn find_all(&self) -> Result<Vec<Animal>> {
        AnimalStore::find_all(&self.inner).await
    }

    async fn get_by_id(&self, id: AnimalId) -> Result<Animal> {
        self.inner.get_by_id(id).await
    }

    async fn create(&self, animal: NewAnimal) -> Result<Animal> {
        Self::trip(&self.fail_animal_create)?;
        AnimalStore::create(&self.inner, animal).await
    }

    async fn save(&self, animal: &Animal) -> Result<Animal> {
        AnimalStore::save(&self.inner, animal).await
    }

    async fn save_all(&self, animals: &[Animal]) -> Result<Vec<Animal>> {
        Self::trip(&self.fail_save_all)?;
        self.inner.save_all(animals).await
    }

    async fn delete(&self, id: AnimalId) -> Result<()> {
        AnimalStore::delete(&self.inner, id).await
    }

    async fn delete_all(&self) -> Result<()> {
        AnimalStore::delete_all(&self.inner).await
    }
}

#[async_trait]
impl BarnStore for FlakyStore {
    async fn find_all(&self) -> Result<Vec<Barn>> {
        BarnStore::find_all(&self.inner).await
    }

    async fn create(&self, barn: NewBarn) -> Result<Barn> {
        Self::trip(&self.fail_barn_create)?;
        BarnStore::create(&self.inner, barn).await
    }

    async fn save(&self, barn: &Barn) -> Result<Barn> {
        BarnStore::save(&self.inner, barn).await
    }

    async fn delete(&self, id: BarnId) -> Result<()> {
        Self::trip(&self.fail_barn_delete)?;
        BarnStore::delete(&self.inner, id).await
    }

    async fn delete_all(&self) -> Result<()> {
        Self::trip(&self.fail_barn_delete_all)?;
        BarnStore::delete_all(&self.inner).await
    }
}
