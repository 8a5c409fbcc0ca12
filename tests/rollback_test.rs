mod common;

use barn_allocator::{
    Allocator, AnimalStore, BarnStore, Color, FarmError, NewAnimal, BARN_CAPACITY,
};
use common::{assert_farm_invariants, members_of, seed, stored_sizes, FlakyStore};
use std::sync::atomic::Ordering;

async fn open(store: &FlakyStore) -> Allocator<FlakyStore, FlakyStore> {
    Allocator::open(store.clone(), store.clone(), BARN_CAPACITY)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_failed_split_leaves_farm_untouched() {
    let store = FlakyStore::default();
    let barns = seed(&store.inner, Color::Red, &[20]).await;
    let allocator = open(&store).await;
    let before = members_of(&store, barns[0]).await;

    store.fail_save_all.store(true, Ordering::SeqCst);
    let err = allocator
        .add_animal(NewAnimal::new("red-20", Color::Red))
        .await
        .unwrap_err();

    assert!(matches!(err, FarmError::StoreError { .. }));
    assert_eq!(AnimalStore::find_all(&store).await.unwrap().len(), 20);
    assert_eq!(BarnStore::find_all(&store).await.unwrap().len(), 1);
    assert_eq!(members_of(&store, barns[0]).await, before);
    assert_eq!(allocator.occupancy().await.len(), 1);

    // the same insert goes through once the store recovers
    allocator
        .add_animal(NewAnimal::new("red-20", Color::Red))
        .await
        .unwrap();
    assert_eq!(stored_sizes(&store, Color::Red).await, vec![10, 11]);
    assert_farm_invariants(&store, BARN_CAPACITY).await;
}

#[tokio::test]
async fn test_failed_barn_teardown_restores_removed_animal() {
    let store = FlakyStore::default();
    let barns = seed(&store.inner, Color::Blue, &[3, 4]).await;
    let allocator = open(&store).await;
    let leaving = members_of(&store, barns[0]).await[0].clone();

    store.fail_barn_delete.store(true, Ordering::SeqCst);
    let err = allocator.remove_animal(leaving.id).await.unwrap_err();

    assert!(matches!(err, FarmError::StoreError { .. }));
    assert_eq!(store.get_by_id(leaving.id).await.unwrap(), leaving);
    assert_eq!(stored_sizes(&store, Color::Blue).await, vec![3, 4]);
    assert_eq!(BarnStore::find_all(&store).await.unwrap().len(), 2);

    // 6 animals fit in one barn: the smaller barn is folded into the other
    allocator.remove_animal(leaving.id).await.unwrap();
    assert_eq!(stored_sizes(&store, Color::Blue).await, vec![6]);
    assert_farm_invariants(&store, BARN_CAPACITY).await;
}

#[tokio::test]
async fn test_failed_first_insert_drops_the_new_animal() {
    let store = FlakyStore::default();
    let allocator = open(&store).await;

    store.fail_save_all.store(true, Ordering::SeqCst);
    let result = allocator
        .add_animal(NewAnimal::new("Daisy", Color::Orange))
        .await;

    assert!(result.is_err());
    assert!(AnimalStore::find_all(&store).await.unwrap().is_empty());
    assert!(BarnStore::find_all(&store).await.unwrap().is_empty());
    assert!(allocator.occupancy().await.is_empty());
}

#[tokio::test]
async fn test_failed_animal_create_changes_nothing() {
    let store = FlakyStore::default();
    let barns = seed(&store.inner, Color::Green, &[3]).await;
    let allocator = open(&store).await;

    store.fail_animal_create.store(true, Ordering::SeqCst);
    let err = allocator
        .add_animal(NewAnimal::new("Fern", Color::Green))
        .await
        .unwrap_err();

    assert!(matches!(err, FarmError::StoreError { .. }));
    assert_eq!(AnimalStore::find_all(&store).await.unwrap().len(), 3);
    assert_eq!(allocator.occupancy().await[0].members, 3);

    let admitted = allocator
        .add_animal(NewAnimal::new("Fern", Color::Green))
        .await
        .unwrap();
    assert_eq!(admitted.placement.barn(), Some(barns[0]));
    assert_eq!(stored_sizes(&store, Color::Green).await, vec![4]);
}

#[tokio::test]
async fn test_failed_barn_create_drops_the_new_animal() {
    let store = FlakyStore::default();
    let barns = seed(&store.inner, Color::Yellow, &[20]).await;
    let allocator = open(&store).await;
    let before = members_of(&store, barns[0]).await;

    store.fail_barn_create.store(true, Ordering::SeqCst);
    let err = allocator
        .add_animal(NewAnimal::new("yellow-20", Color::Yellow))
        .await
        .unwrap_err();

    assert!(matches!(err, FarmError::StoreError { .. }));
    assert_eq!(AnimalStore::find_all(&store).await.unwrap().len(), 20);
    assert_eq!(BarnStore::find_all(&store).await.unwrap().len(), 1);
    assert_eq!(members_of(&store, barns[0]).await, before);
    assert_eq!(allocator.occupancy().await.len(), 1);

    allocator
        .add_animal(NewAnimal::new("yellow-20", Color::Yellow))
        .await
        .unwrap();
    assert_eq!(stored_sizes(&store, Color::Yellow).await, vec![10, 11]);
    assert_farm_invariants(&store, BARN_CAPACITY).await;
}

#[tokio::test]
async fn test_failed_clear_restores_animals_and_ledger() {
    let store = FlakyStore::default();
    seed(&store.inner, Color::Red, &[20]).await;
    let allocator = open(&store).await;

    store.fail_barn_delete_all.store(true, Ordering::SeqCst);
    let err = allocator.delete_all().await.unwrap_err();

    assert!(matches!(err, FarmError::StoreError { .. }));
    assert_eq!(AnimalStore::find_all(&store).await.unwrap().len(), 20);
    assert_eq!(stored_sizes(&store, Color::Red).await, vec![20]);
    assert_farm_invariants(&store, BARN_CAPACITY).await;

    // the ledger still matches the store, so a split moves real animals
    allocator
        .add_animal(NewAnimal::new("red-20", Color::Red))
        .await
        .unwrap();
    let seated: usize = allocator.occupancy().await.iter().map(|b| b.members).sum();
    assert_eq!(seated, AnimalStore::find_all(&store).await.unwrap().len());
    assert_eq!(stored_sizes(&store, Color::Red).await, vec![10, 11]);
    assert_farm_invariants(&store, BARN_CAPACITY).await;

    allocator.delete_all().await.unwrap();
    assert!(AnimalStore::find_all(&store).await.unwrap().is_empty());
    assert!(BarnStore::find_all(&store).await.unwrap().is_empty());
    assert!(allocator.occupancy().await.is_empty());
}
