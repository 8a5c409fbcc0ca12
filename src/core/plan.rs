//! Placement planning.
//!
//! A [`Planner`] works on a scratch copy of a [`CategoryLedger`] and records
//! every barn and placement change as a [`Step`]. Nothing touches a store
//! here; the resulting [`Plan`] is applied later by a unit of work.

use crate::core::ledger::{BarnKey, CategoryLedger};
use crate::domain::model::AnimalId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    OpenBarn { key: BarnKey, name: String },
    Place { animal: AnimalId, barn: BarnKey },
    Vacate { animal: AnimalId, barn: BarnKey },
    CloseBarn { key: BarnKey, name: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Animals whose placement changed at least once, in first-touched order.
    pub fn touched(&self) -> Vec<AnimalId> {
        let mut seen = Vec::new();
        for step in &self.steps {
            let animal = match step {
                Step::Place { animal, .. } | Step::Vacate { animal, .. } => *animal,
                _ => continue,
            };
            if !seen.contains(&animal) {
                seen.push(animal);
            }
        }
        seen
    }

    pub fn opened(&self) -> impl Iterator<Item = (BarnKey, &str)> {
        self.steps.iter().filter_map(|step| match step {
            Step::OpenBarn { key, name } => Some((*key, name.as_str())),
            _ => None,
        })
    }

    pub fn closed(&self) -> impl Iterator<Item = (BarnKey, &str)> {
        self.steps.iter().filter_map(|step| match step {
            Step::CloseBarn { key, name } => Some((*key, name.as_str())),
            _ => None,
        })
    }

    /// Number of animals moved from one barn straight into another.
    pub fn moves(&self) -> usize {
        self.steps
            .windows(2)
            .filter(|pair| {
                matches!(pair,
                    [Step::Vacate { animal: a, .. }, Step::Place { animal: b, .. }] if a == b)
            })
            .count()
    }
}

pub struct Planner<'a> {
    ledger: &'a mut CategoryLedger,
    capacity: usize,
    steps: Vec<Step>,
}

impl<'a> Planner<'a> {
    pub fn new(ledger: &'a mut CategoryLedger, capacity: usize) -> Self {
        Self {
            ledger,
            capacity,
            steps: Vec::new(),
        }
    }

    pub fn finish(self) -> Plan {
        Plan { steps: self.steps }
    }

    /// Seats an animal that currently has no barn.
    ///
    /// Goes to the least populated barn, unless every barn is full: then a
    /// new barn is opened for it and the color is split evenly across all
    /// barns.
    pub fn place(&mut self, animal: AnimalId) {
        let groups = self.ledger.groups();

        match groups.first() {
            None => {
                let key = self.open_barn(0);
                self.assign(animal, key);
            }
            Some(&smallest) if self.ledger.size(smallest) >= self.capacity => {
                let key = self.open_barn(groups.len());
                self.assign(animal, key);
                self.redistribute(key, &groups);
            }
            Some(&smallest) => self.assign(animal, smallest),
        }
    }

    /// Skew correction followed by conditional barn elimination. Runs after a
    /// removal; does nothing with fewer than two populated barns.
    pub fn reorganize(&mut self) {
        let groups = self.ledger.groups();
        if groups.len() < 2 {
            return;
        }

        let total = self.ledger.population();
        let survivors = groups.len() - 1;
        let per_barn = total / survivors;
        let remainder = total % survivors;

        let smallest = groups[0];
        let largest = groups[survivors];

        // one animal per call, smallest against largest only
        if self.ledger.size(smallest) + 1 < self.ledger.size(largest) {
            if let Some(&animal) = self.ledger.members(largest).last() {
                tracing::debug!("Skew correction: moving animal {} to the smallest barn", animal);
                self.relocate(animal, smallest);
            }
        }

        if per_barn <= self.capacity && remainder == 0 {
            let evicted = self.close(smallest);
            for animal in evicted {
                self.place(animal);
            }
        }
    }

    /// Closes `key` if nobody lives there anymore.
    pub fn close_if_empty(&mut self, key: BarnKey) {
        if self.ledger.slot(key).is_some_and(|s| s.members.is_empty()) {
            self.close(key);
        }
    }

    /// Closes every empty barn, then seats each stray through [`Planner::place`].
    pub fn settle(&mut self, strays: &[AnimalId]) {
        for key in self.ledger.empty_barns() {
            self.close(key);
        }
        for &animal in strays {
            self.ledger.vacate(animal);
            self.place(animal);
        }
    }

    fn open_barn(&mut self, ordinal: usize) -> BarnKey {
        let name = self.ledger.barn_name(ordinal);
        let key = self.ledger.open_pending(name.clone());
        self.steps.push(Step::OpenBarn { key, name });
        key
    }

    fn assign(&mut self, animal: AnimalId, barn: BarnKey) {
        self.ledger.place(animal, barn);
        self.steps.push(Step::Place { animal, barn });
    }

    fn relocate(&mut self, animal: AnimalId, to: BarnKey) {
        if let Some(from) = self.ledger.vacate(animal) {
            self.steps.push(Step::Vacate { animal, barn: from });
        }
        self.assign(animal, to);
    }

    fn close(&mut self, key: BarnKey) -> Vec<AnimalId> {
        let Some(slot) = self.ledger.close(key) else {
            return Vec::new();
        };
        for &animal in &slot.members {
            self.steps.push(Step::Vacate { animal, barn: key });
        }
        self.steps.push(Step::CloseBarn {
            key,
            name: slot.name,
        });
        slot.members
    }

    /// Even split of the color across `existing` plus the freshly opened
    /// barn. Existing barns take the larger shares first and hand their
    /// surplus tail to the new barn.
    fn redistribute(&mut self, fresh: BarnKey, existing: &[BarnKey]) {
        let total: usize = existing.iter().map(|k| self.ledger.size(*k)).sum::<usize>()
            + self.ledger.size(fresh);
        let barns = existing.len() + 1;
        let floor = total / barns;
        let remainder = total % barns;

        for (i, &key) in existing.iter().enumerate() {
            let share = floor + usize::from(i < remainder);
            let surplus: Vec<AnimalId> = self.ledger.members(key).iter().skip(share).copied().collect();
            for animal in surplus {
                self.relocate(animal, fresh);
            }
        }

        tracing::debug!(
            "Redistributed {} {} animals across {} barns",
            total,
            self.ledger.color(),
            barns
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Animal, Color, Placement};
    use chrono::Utc;

    const CAPACITY: usize = 20;

    /// Ledger with one barn per entry of `sizes`, populated in order.
    fn ledger_with(sizes: &[usize]) -> (CategoryLedger, Vec<BarnKey>) {
        let mut ledger = CategoryLedger::new(Color::Red);
        let mut keys = Vec::new();
        let mut next_id = 0;
        for (ordinal, &size) in sizes.iter().enumerate() {
            let key = ledger.open_pending(format!("RED{}", ordinal));
            for _ in 0..size {
                next_id += 1;
                seat(&mut ledger, next_id, key);
            }
            keys.push(key);
        }
        (ledger, keys)
    }

    fn seat(ledger: &mut CategoryLedger, id: u64, key: BarnKey) {
        ledger.insert_animal(Animal {
            id: AnimalId(id),
            name: format!("animal-{}", id),
            favorite_color: Color::Red,
            placement: Placement::Unassigned,
            admitted_at: Utc::now(),
        });
        ledger.place(AnimalId(id), key);
    }

    fn sizes(ledger: &CategoryLedger) -> Vec<usize> {
        ledger.groups().iter().map(|k| ledger.size(*k)).collect()
    }

    fn newcomer(ledger: &mut CategoryLedger, id: u64) -> AnimalId {
        ledger.insert_animal(Animal {
            id: AnimalId(id),
            name: "newcomer".to_string(),
            favorite_color: Color::Red,
            placement: Placement::Unassigned,
            admitted_at: Utc::now(),
        });
        AnimalId(id)
    }

    #[test]
    fn test_place_opens_first_barn() {
        let (mut ledger, _) = ledger_with(&[]);
        let id = newcomer(&mut ledger, 1);

        let mut planner = Planner::new(&mut ledger, CAPACITY);
        planner.place(id);
        let plan = planner.finish();

        assert_eq!(plan.opened().map(|(_, n)| n.to_string()).collect::<Vec<_>>(), vec!["RED0"]);
        assert_eq!(ledger.barn_count(), 1);
        assert_eq!(sizes(&ledger), vec![1]);
    }

    #[test]
    fn test_place_joins_smallest_barn() {
        let (mut ledger, keys) = ledger_with(&[4, 2, 3]);
        let id = newcomer(&mut ledger, 100);

        let mut planner = Planner::new(&mut ledger, CAPACITY);
        planner.place(id);
        let plan = planner.finish();

        assert_eq!(plan.steps, vec![Step::Place { animal: id, barn: keys[1] }]);
        assert_eq!(ledger.size(keys[1]), 3);
    }

    #[test]
    fn test_full_barn_splits_evenly() {
        let (mut ledger, keys) = ledger_with(&[20]);
        let id = newcomer(&mut ledger, 100);

        let mut planner = Planner::new(&mut ledger, CAPACITY);
        planner.place(id);
        let plan = planner.finish();

        assert_eq!(ledger.barn_count(), 2);
        assert_eq!(ledger.size(keys[0]), 11);
        assert_eq!(ledger.population(), 21);
        assert_eq!(sizes(&ledger), vec![10, 11]);
        assert_eq!(plan.moves(), 9);
        assert_eq!(plan.opened().next().map(|(_, n)| n.to_string()), Some("RED1".to_string()));
    }

    #[test]
    fn test_split_of_several_full_barns_stays_within_one() {
        let (mut ledger, _) = ledger_with(&[20, 20]);
        let id = newcomer(&mut ledger, 100);

        let mut planner = Planner::new(&mut ledger, CAPACITY);
        planner.place(id);

        // 41 animals over 3 barns
        assert_eq!(sizes(&ledger), vec![13, 14, 14]);
    }

    #[test]
    fn test_reorganize_skips_single_barn() {
        let (mut ledger, _) = ledger_with(&[7]);

        let mut planner = Planner::new(&mut ledger, CAPACITY);
        planner.reorganize();

        assert!(planner.finish().is_empty());
        assert_eq!(sizes(&ledger), vec![7]);
    }

    #[test]
    fn test_reorganize_skips_empty_color() {
        let (mut ledger, _) = ledger_with(&[]);

        let mut planner = Planner::new(&mut ledger, CAPACITY);
        planner.reorganize();

        assert!(planner.finish().is_empty());
    }

    #[test]
    fn test_skew_correction_never_widens_gap() {
        let (mut ledger, _) = ledger_with(&[5, 5, 15]);

        let gap = |l: &CategoryLedger| {
            let s = sizes(l);
            s[s.len() - 1] - s[0]
        };

        let mut before = gap(&ledger);
        for _ in 0..20 {
            let mut planner = Planner::new(&mut ledger, CAPACITY);
            planner.reorganize();
            let plan = planner.finish();
            let after = gap(&ledger);

            if plan.moves() > 0 {
                assert!(after < before, "gap {} -> {}", before, after);
            } else {
                assert_eq!(after, before);
            }
            assert_eq!(ledger.barn_count(), 3);
            before = after;
        }

        assert!(before <= 1);
        assert_eq!(ledger.population(), 25);
    }

    #[test]
    fn test_elimination_when_even_split_fits() {
        // [7, 7, 7] after one removal from the first barn
        let (mut ledger, keys) = ledger_with(&[6, 7, 7]);

        let mut planner = Planner::new(&mut ledger, CAPACITY);
        planner.reorganize();
        let plan = planner.finish();

        assert_eq!(ledger.barn_count(), 2);
        assert_eq!(sizes(&ledger), vec![10, 10]);
        assert!(ledger.slot(keys[0]).is_none());
        assert_eq!(plan.closed().count(), 1);
        assert_eq!(plan.touched().len(), 6);
    }

    #[test]
    fn test_elimination_merges_two_small_barns() {
        let (mut ledger, _) = ledger_with(&[3, 4]);

        let mut planner = Planner::new(&mut ledger, CAPACITY);
        planner.reorganize();

        assert_eq!(sizes(&ledger), vec![7]);
    }

    #[test]
    fn test_no_elimination_when_survivors_would_overflow() {
        let (mut ledger, _) = ledger_with(&[10, 11]);

        let mut planner = Planner::new(&mut ledger, CAPACITY);
        planner.reorganize();

        assert!(planner.finish().is_empty());
        assert_eq!(sizes(&ledger), vec![10, 11]);
    }

    #[test]
    fn test_settle_closes_empty_and_seats_strays() {
        let (mut ledger, keys) = ledger_with(&[0, 3]);
        let stray = newcomer(&mut ledger, 100);

        let mut planner = Planner::new(&mut ledger, CAPACITY);
        planner.settle(&[stray]);
        let plan = planner.finish();

        assert!(ledger.slot(keys[0]).is_none());
        assert_eq!(ledger.size(keys[1]), 4);
        assert_eq!(plan.closed().count(), 1);
    }
}
