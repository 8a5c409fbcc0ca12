use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::core::ledger::CategoryLedger;
use crate::core::plan::Planner;
use crate::core::unit_of_work::UnitOfWork;
use crate::domain::model::{Animal, AnimalId, BarnOccupancy, Color, NewAnimal};
use crate::domain::ports::{AnimalStore, BarnStore};
use crate::utils::error::{FarmError, Result};

/// Seats animals in barns of their favorite color and keeps those barns
/// evenly filled as animals come and go.
///
/// Each color has its own ledger behind its own lock; an operation holds the
/// lock of its color for its whole duration, store writes included, so
/// operations on one color are serialized while different colors proceed in
/// parallel.
pub struct Allocator<A: AnimalStore, B: BarnStore> {
    animals: A,
    barns: B,
    capacity: usize,
    ledgers: HashMap<Color, Mutex<CategoryLedger>>,
}

impl<A: AnimalStore, B: BarnStore> Allocator<A, B> {
    /// Loads every animal and barn once, builds the per-color ledgers and
    /// repairs what does not fit: empty barns are closed, unassigned or
    /// misplaced animals are seated.
    pub async fn open(animals: A, barns: B, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(FarmError::InvalidConfigValueError {
                field: "allocation.barn_capacity".to_string(),
                value: capacity.to_string(),
                reason: "Barns must hold at least one animal".to_string(),
            });
        }

        let stored_animals = animals.find_all().await?;
        let stored_barns: HashMap<_, _> = barns
            .find_all()
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();
        tracing::info!(
            "Loaded {} animals and {} barns",
            stored_animals.len(),
            stored_barns.len()
        );

        let mut ledgers = HashMap::new();
        let mut strays = Vec::new();
        for color in Color::ALL {
            let (ledger, color_strays) =
                CategoryLedger::hydrate(color, &stored_barns, &stored_animals, capacity);
            if !color_strays.is_empty() || !ledger.empty_barns().is_empty() {
                strays.push((color, color_strays));
            }
            ledgers.insert(color, Mutex::new(ledger));
        }

        let allocator = Self {
            animals,
            barns,
            capacity,
            ledgers,
        };

        for (color, color_strays) in strays {
            allocator.settle(color, &color_strays).await?;
        }

        Ok(allocator)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn ledger(&self, color: Color) -> &Mutex<CategoryLedger> {
        // every color gets a ledger in `open`
        &self.ledgers[&color]
    }

    pub async fn find_all(&self) -> Result<Vec<Animal>> {
        self.animals.find_all().await
    }

    /// Admits a new animal and returns it with its barn.
    pub async fn add_animal(&self, animal: NewAnimal) -> Result<Animal> {
        let mut ledger = self.ledger(animal.favorite_color).lock().await;
        let mut uow = UnitOfWork::begin(&self.animals, &self.barns);

        match self.admit(&mut uow, &ledger, animal).await {
            Ok((scratch, admitted)) => {
                uow.commit();
                *ledger = scratch;
                Ok(admitted)
            }
            Err(e) => {
                uow.rollback().await;
                Err(e)
            }
        }
    }

    async fn admit(
        &self,
        uow: &mut UnitOfWork<'_, A, B>,
        ledger: &CategoryLedger,
        animal: NewAnimal,
    ) -> Result<(CategoryLedger, Animal)> {
        let created = uow.create_animal(animal).await?;
        let id = created.id;

        let mut scratch = ledger.clone();
        scratch.insert_animal(created);

        let mut planner = Planner::new(&mut scratch, self.capacity);
        planner.place(id);
        let plan = planner.finish();

        scratch.verify(self.capacity)?;
        uow.apply(&plan, &mut scratch).await?;

        let admitted = scratch
            .animal(id)
            .cloned()
            .ok_or_else(|| FarmError::not_found_animal(id.0))?;
        tracing::debug!(
            "Animal {} ({}) placed in barn {:?}, {} moved",
            admitted.id,
            admitted.favorite_color,
            admitted.placement.barn(),
            plan.moves()
        );
        Ok((scratch, admitted))
    }

    /// Admits animals one at a time, in order. Stops at the first failure;
    /// animals admitted before it stay on the farm.
    pub async fn add_animals(&self, animals: Vec<NewAnimal>) -> Result<Vec<Animal>> {
        let mut admitted = Vec::with_capacity(animals.len());
        for animal in animals {
            admitted.push(self.add_animal(animal).await?);
        }
        tracing::info!("Admitted {} animals", admitted.len());
        Ok(admitted)
    }

    /// Removes an animal by id. The animal is reloaded from the store, so a
    /// stale copy held by the caller is never written back.
    pub async fn remove_animal(&self, id: AnimalId) -> Result<()> {
        // favorite colors never change, so the first read picks the right lock
        let color = self.animals.get_by_id(id).await?.favorite_color;
        let mut ledger = self.ledger(color).lock().await;
        let animal = self.animals.get_by_id(id).await?;
        let mut uow = UnitOfWork::begin(&self.animals, &self.barns);

        match self.evict(&mut uow, &ledger, &animal).await {
            Ok(scratch) => {
                uow.commit();
                *ledger = scratch;
                Ok(())
            }
            Err(e) => {
                uow.rollback().await;
                Err(e)
            }
        }
    }

    async fn evict(
        &self,
        uow: &mut UnitOfWork<'_, A, B>,
        ledger: &CategoryLedger,
        animal: &Animal,
    ) -> Result<CategoryLedger> {
        let mut scratch = ledger.clone();
        let former_home = scratch.remove_animal(animal.id);

        let mut planner = Planner::new(&mut scratch, self.capacity);
        // an animal the ledger never seated leaves every barn as it was
        if let Some(home) = former_home {
            planner.close_if_empty(home);
            planner.reorganize();
        }
        let plan = planner.finish();

        scratch.verify(self.capacity)?;
        uow.delete_animal(animal).await?;
        uow.apply(&plan, &mut scratch).await?;

        tracing::debug!(
            "Animal {} removed from {}, {} moved, {} barns closed",
            animal.id,
            animal.favorite_color,
            plan.moves(),
            plan.closed().count()
        );
        Ok(scratch)
    }

    /// Removes animals by id, in order, each through [`Allocator::remove_animal`].
    /// An unknown id stops the batch with `NotFound`.
    pub async fn remove_animals(&self, ids: &[AnimalId]) -> Result<()> {
        for &id in ids {
            self.remove_animal(id).await?;
        }
        tracing::info!("Removed {} animals", ids.len());
        Ok(())
    }

    /// Empties the farm: every animal and every barn.
    pub async fn delete_all(&self) -> Result<()> {
        let mut guards = Vec::with_capacity(Color::ALL.len());
        for color in Color::ALL {
            guards.push(self.ledger(color).lock().await);
        }

        let mut uow = UnitOfWork::begin(&self.animals, &self.barns);
        let mut outcome = uow.clear_animals().await;
        if outcome.is_ok() {
            outcome = uow.clear_barns().await;
        }
        if let Err(e) = outcome {
            uow.rollback().await;
            return Err(e);
        }
        uow.commit();

        for guard in &mut guards {
            let color = guard.color();
            **guard = CategoryLedger::new(color);
        }
        tracing::info!("Farm cleared");
        Ok(())
    }

    /// Barn populations by color, barns in creation order.
    pub async fn occupancy(&self) -> Vec<BarnOccupancy> {
        let mut report = Vec::new();
        for color in Color::ALL {
            report.extend(self.ledger(color).lock().await.occupancy());
        }
        report
    }

    async fn settle(&self, color: Color, strays: &[AnimalId]) -> Result<()> {
        let mut ledger = self.ledger(color).lock().await;
        let mut uow = UnitOfWork::begin(&self.animals, &self.barns);

        let mut scratch = ledger.clone();
        let mut planner = Planner::new(&mut scratch, self.capacity);
        planner.settle(strays);
        let plan = planner.finish();

        let outcome = match scratch.verify(self.capacity) {
            Ok(()) => uow.apply(&plan, &mut scratch).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                tracing::warn!(
                    "Settled {}: {} animals seated, {} empty barns closed",
                    color,
                    strays.len(),
                    plan.closed().count()
                );
                uow.commit();
                *ledger = scratch;
                Ok(())
            }
            Err(e) => {
                uow.rollback().await;
                Err(e)
            }
        }
    }
}
