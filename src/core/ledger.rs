//! Per-color index of barns and their members.
//!
//! The allocator keeps one [`CategoryLedger`] per color so that every
//! operation reads barn populations from memory instead of rescanning the
//! animal table. Barns are kept in creation order; that order breaks ties
//! when groups are sorted by size.

use std::collections::HashMap;

use crate::domain::model::{Animal, AnimalId, Barn, BarnId, BarnOccupancy, Color, Placement};
use crate::utils::error::{FarmError, Result};

/// Handle on a barn inside a ledger. Barns opened by a plan stay `Pending`
/// until the barn store hands back their id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarnKey {
    Stored(BarnId),
    Pending(u32),
}

#[derive(Debug, Clone)]
pub struct BarnSlot {
    pub key: BarnKey,
    pub name: String,
    pub members: Vec<AnimalId>,
}

#[derive(Debug, Clone)]
pub struct CategoryLedger {
    color: Color,
    slots: Vec<BarnSlot>,
    animals: HashMap<AnimalId, Animal>,
    homes: HashMap<AnimalId, BarnKey>,
    next_pending: u32,
}

impl CategoryLedger {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            slots: Vec::new(),
            animals: HashMap::new(),
            homes: HashMap::new(),
            next_pending: 0,
        }
    }

    /// Builds the ledger for `color` from stored rows.
    ///
    /// Returns the ids of animals that could not be seated where the store
    /// says they live: unassigned animals, animals pointing at a missing or
    /// foreign-colored barn, and overflow beyond `capacity`.
    pub fn hydrate(
        color: Color,
        barns: &HashMap<BarnId, Barn>,
        animals: &[Animal],
        capacity: usize,
    ) -> (Self, Vec<AnimalId>) {
        let mut ledger = Self::new(color);

        let mut own_barns: Vec<&Barn> = barns.values().filter(|b| b.color == color).collect();
        own_barns.sort_by_key(|b| b.id);
        for barn in own_barns {
            ledger.slots.push(BarnSlot {
                key: BarnKey::Stored(barn.id),
                name: barn.name.clone(),
                members: Vec::new(),
            });
        }

        let mut own_animals: Vec<&Animal> =
            animals.iter().filter(|a| a.favorite_color == color).collect();
        own_animals.sort_by_key(|a| a.id);

        let mut strays = Vec::new();
        for animal in own_animals {
            ledger.animals.insert(animal.id, animal.clone());
            let Placement::Assigned(barn_id) = animal.placement else {
                strays.push(animal.id);
                continue;
            };

            match barns.get(&barn_id) {
                None => {
                    tracing::warn!("Animal {} points at missing barn {}", animal.id, barn_id);
                    strays.push(animal.id);
                }
                Some(barn) if barn.color != color => {
                    tracing::warn!(
                        "Animal {} ({}) sits in {} barn {}",
                        animal.id,
                        color,
                        barn.color,
                        barn.name
                    );
                    strays.push(animal.id);
                }
                Some(_) => {
                    let key = BarnKey::Stored(barn_id);
                    if ledger.size(key) >= capacity {
                        tracing::warn!("Barn {} is over capacity, unseating animal {}", barn_id, animal.id);
                        strays.push(animal.id);
                    } else {
                        ledger.place(animal.id, key);
                    }
                }
            }
        }

        (ledger, strays)
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn animal(&self, id: AnimalId) -> Option<&Animal> {
        self.animals.get(&id)
    }

    /// Animals currently seated in a barn.
    pub fn population(&self) -> usize {
        self.homes.len()
    }

    pub fn barn_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, key: BarnKey) -> Option<&BarnSlot> {
        self.slots.iter().find(|s| s.key == key)
    }

    pub fn size(&self, key: BarnKey) -> usize {
        self.slot(key).map_or(0, |s| s.members.len())
    }

    pub fn members(&self, key: BarnKey) -> &[AnimalId] {
        self.slot(key).map_or(&[], |s| s.members.as_slice())
    }

    pub fn home(&self, animal: AnimalId) -> Option<BarnKey> {
        self.homes.get(&animal).copied()
    }

    /// Non-empty barns sorted ascending by population, ties in creation order.
    pub fn groups(&self) -> Vec<BarnKey> {
        let mut groups: Vec<&BarnSlot> = self.slots.iter().filter(|s| !s.members.is_empty()).collect();
        groups.sort_by_key(|s| s.members.len());
        groups.into_iter().map(|s| s.key).collect()
    }

    /// Barns with no members left.
    pub fn empty_barns(&self) -> Vec<BarnKey> {
        self.slots
            .iter()
            .filter(|s| s.members.is_empty())
            .map(|s| s.key)
            .collect()
    }

    /// `<COLOR><ordinal>`, bumping the ordinal past names already taken.
    pub fn barn_name(&self, ordinal: usize) -> String {
        (ordinal..)
            .map(|n| format!("{}{}", self.color.name(), n))
            .find(|name| self.slots.iter().all(|s| &s.name != name))
            .unwrap_or_else(|| format!("{}{}", self.color.name(), ordinal))
    }

    pub fn insert_animal(&mut self, animal: Animal) {
        self.animals.insert(animal.id, animal);
    }

    /// Forgets an animal entirely, returning the barn it was seated in.
    pub fn remove_animal(&mut self, id: AnimalId) -> Option<BarnKey> {
        let home = self.vacate(id);
        self.animals.remove(&id);
        home
    }

    pub fn open_pending(&mut self, name: String) -> BarnKey {
        let key = BarnKey::Pending(self.next_pending);
        self.next_pending += 1;
        self.slots.push(BarnSlot {
            key,
            name,
            members: Vec::new(),
        });
        key
    }

    pub fn place(&mut self, animal: AnimalId, key: BarnKey) {
        self.vacate(animal);
        if let Some(slot) = self.slots.iter_mut().find(|s| s.key == key) {
            slot.members.push(animal);
            self.homes.insert(animal, key);
        }
    }

    pub fn vacate(&mut self, animal: AnimalId) -> Option<BarnKey> {
        let key = self.homes.remove(&animal)?;
        if let Some(slot) = self.slots.iter_mut().find(|s| s.key == key) {
            slot.members.retain(|m| *m != animal);
        }
        Some(key)
    }

    /// Drops a barn and unseats its members, returned in seating order.
    pub fn close(&mut self, key: BarnKey) -> Option<BarnSlot> {
        let index = self.slots.iter().position(|s| s.key == key)?;
        let slot = self.slots.remove(index);
        for member in &slot.members {
            self.homes.remove(member);
        }
        Some(slot)
    }

    pub fn resolve(&mut self, pending: BarnKey, id: BarnId) {
        let stored = BarnKey::Stored(id);
        if let Some(slot) = self.slots.iter_mut().find(|s| s.key == pending) {
            slot.key = stored;
            for member in &slot.members {
                self.homes.insert(*member, stored);
            }
        }
    }

    /// Placement as it should be persisted. Pending barns must be resolved first.
    pub fn placement_of(&self, animal: AnimalId) -> Placement {
        match self.homes.get(&animal) {
            Some(BarnKey::Stored(id)) => Placement::Assigned(*id),
            Some(BarnKey::Pending(_)) | None => Placement::Unassigned,
        }
    }

    pub fn record_placement(&mut self, animal: AnimalId, placement: Placement) {
        if let Some(record) = self.animals.get_mut(&animal) {
            record.placement = placement;
        }
    }

    /// Checks capacity and color consistency of every seated animal.
    pub fn verify(&self, capacity: usize) -> Result<()> {
        for slot in &self.slots {
            if slot.members.len() > capacity {
                return Err(FarmError::CapacityInvariant {
                    barn: slot.name.clone(),
                    size: slot.members.len(),
                    capacity,
                });
            }
            for member in &slot.members {
                let same_color = self
                    .animals
                    .get(member)
                    .is_some_and(|a| a.favorite_color == self.color);
                if !same_color {
                    return Err(FarmError::ColorMismatch {
                        animal: member.0,
                        barn: slot.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn occupancy(&self) -> Vec<BarnOccupancy> {
        self.slots
            .iter()
            .filter_map(|slot| match slot.key {
                BarnKey::Stored(id) => Some(BarnOccupancy {
                    id,
                    name: slot.name.clone(),
                    color: self.color,
                    members: slot.members.len(),
                }),
                BarnKey::Pending(_) => None,
            })
            .collect()
    }
}
