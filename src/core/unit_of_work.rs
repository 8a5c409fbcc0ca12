//! Scoped write set for one allocator operation.
//!
//! Every store write goes through a [`UnitOfWork`], which journals enough to
//! undo it. `commit` drops the journal; `rollback` replays it backwards.

use crate::core::ledger::{BarnKey, CategoryLedger};
use crate::core::plan::Plan;
use crate::domain::model::{Animal, AnimalId, Barn, BarnId, NewAnimal, NewBarn};
use crate::domain::ports::{AnimalStore, BarnStore};
use crate::utils::error::Result;

#[derive(Debug)]
enum Undo {
    DropAnimal(AnimalId),
    RestoreAnimals(Vec<Animal>),
    DropBarn(BarnId),
    RestoreBarn(Barn),
}

pub struct UnitOfWork<'s, A: ?Sized, B: ?Sized> {
    animals: &'s A,
    barns: &'s B,
    journal: Vec<Undo>,
}

impl<'s, A, B> UnitOfWork<'s, A, B>
where
    A: AnimalStore + ?Sized,
    B: BarnStore + ?Sized,
{
    pub fn begin(animals: &'s A, barns: &'s B) -> Self {
        Self {
            animals,
            barns,
            journal: Vec::new(),
        }
    }

    pub async fn create_animal(&mut self, animal: NewAnimal) -> Result<Animal> {
        let created = self.animals.create(animal).await?;
        self.journal.push(Undo::DropAnimal(created.id));
        Ok(created)
    }

    pub async fn delete_animal(&mut self, animal: &Animal) -> Result<()> {
        self.animals.delete(animal.id).await?;
        self.journal.push(Undo::RestoreAnimals(vec![animal.clone()]));
        Ok(())
    }

    /// Deletes every animal, keeping the rows so they can be put back.
    pub async fn clear_animals(&mut self) -> Result<()> {
        let animals = self.animals.find_all().await?;
        self.animals.delete_all().await?;
        if !animals.is_empty() {
            self.journal.push(Undo::RestoreAnimals(animals));
        }
        Ok(())
    }

    pub async fn clear_barns(&mut self) -> Result<()> {
        let barns = self.barns.find_all().await?;
        self.barns.delete_all().await?;
        self.journal.extend(barns.into_iter().map(Undo::RestoreBarn));
        Ok(())
    }

    /// Writes `plan` against the stores: opened barns first, then one batch
    /// of placement changes, then closed barns. `ledger` is the scratch
    /// ledger the plan was computed on; pending barns get their stored ids.
    pub async fn apply(&mut self, plan: &Plan, ledger: &mut CategoryLedger) -> Result<()> {
        for (key, name) in plan.opened() {
            // opened and closed within the same plan
            if ledger.slot(key).is_none() {
                continue;
            }
            let barn = self
                .barns
                .create(NewBarn {
                    name: name.to_string(),
                    color: ledger.color(),
                })
                .await?;
            self.journal.push(Undo::DropBarn(barn.id));
            tracing::info!("Opened barn {} (id {})", barn.name, barn.id);
            ledger.resolve(key, barn.id);
        }

        let mut before = Vec::new();
        let mut changed = Vec::new();
        for id in plan.touched() {
            let Some(stored) = ledger.animal(id) else {
                continue;
            };
            let placement = ledger.placement_of(id);
            if placement != stored.placement {
                before.push(stored.clone());
                changed.push(Animal {
                    placement,
                    ..stored.clone()
                });
            }
        }

        if !changed.is_empty() {
            tracing::debug!("Saving {} placement changes", changed.len());
            self.journal.push(Undo::RestoreAnimals(before));
            self.animals.save_all(&changed).await?;
            for animal in &changed {
                ledger.record_placement(animal.id, animal.placement);
            }
        }

        for (key, name) in plan.closed() {
            let BarnKey::Stored(id) = key else {
                continue;
            };
            self.barns.delete(id).await?;
            self.journal.push(Undo::RestoreBarn(Barn {
                id,
                name: name.to_string(),
                color: ledger.color(),
            }));
            tracing::info!("Closed barn {} (id {})", name, id);
        }

        Ok(())
    }

    pub fn commit(self) {
        tracing::debug!("Committed {} writes", self.journal.len());
    }

    /// Undoes every journaled write, newest first. Failures are logged and
    /// skipped so that as much as possible is restored.
    pub async fn rollback(self) {
        if self.journal.is_empty() {
            return;
        }
        tracing::warn!("Rolling back {} writes", self.journal.len());

        for undo in self.journal.into_iter().rev() {
            let outcome = match &undo {
                Undo::DropAnimal(id) => self.animals.delete(*id).await,
                Undo::RestoreAnimals(animals) => self.animals.save_all(animals).await.map(|_| ()),
                Undo::DropBarn(id) => self.barns.delete(*id).await,
                Undo::RestoreBarn(barn) => self.barns.save(barn).await.map(|_| ()),
            };
            if let Err(e) = outcome {
                tracing::error!("Rollback step {:?} failed: {}", undo, e);
            }
        }
    }
}
