//! Concurrent registration tests.

use std::sync::{Arc, Barrier};
use std::thread;

use neomind_mapper::{
    mappable, Mapper, MapperConfig, MappingRegistry, RegistrationMode, TypePair,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct UserDto {
    name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct User {
    name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ItemDto {
    sku: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Item {
    sku: String,
}

mappable!(default: UserDto, User, ItemDto, Item);

fn race_two_pairs(mode: RegistrationMode) -> Arc<MappingRegistry> {
    let registry = Arc::new(MappingRegistry::new());
    let mapper = Mapper::with_config(
        Arc::clone(&registry),
        MapperConfig::default().with_registration(mode),
    );
    let barrier = Arc::new(Barrier::new(2));

    let users = {
        let mapper = mapper.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            mapper.map::<UserDto, User>(&UserDto {
                name: "u".to_string(),
            })
        })
    };
    let items = {
        let mapper = mapper.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            mapper.map::<ItemDto, Item>(&ItemDto {
                sku: "i".to_string(),
            })
        })
    };

    assert_eq!(users.join().unwrap().unwrap().name, "u");
    assert_eq!(items.join().unwrap().unwrap().sku, "i");
    registry
}

#[test]
fn test_concurrent_first_sight_additive() {
    for _ in 0..50 {
        let registry = race_two_pairs(RegistrationMode::Additive);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&TypePair::of::<UserDto, User>()));
        assert!(registry.contains(&TypePair::of::<ItemDto, Item>()));
    }
}

#[test]
fn test_concurrent_first_sight_rebuild() {
    for _ in 0..50 {
        let registry = race_two_pairs(RegistrationMode::Rebuild);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&TypePair::of::<UserDto, User>()));
        assert!(registry.contains(&TypePair::of::<ItemDto, Item>()));
    }
}

#[test]
fn test_many_threads_same_pair_register_once() {
    let registry = Arc::new(MappingRegistry::new());
    let mapper = Mapper::new(Arc::clone(&registry));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let mapper = mapper.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                mapper
                    .map::<UserDto, User>(&UserDto {
                        name: format!("user-{}", i),
                    })
                    .unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap().name, format!("user-{}", i));
    }
    assert_eq!(registry.len(), 1);
    // One initialization, no further mutation.
    assert_eq!(registry.generation(), 1);
}
