//! Explicit rule configuration tests.
//!
//! Tests include:
//! - Renamed and flattened members
//! - Transforms and their failures
//! - Ignored members
//! - Reverse maps
//! - Relaxed and exact name matching

use std::sync::Arc;

use neomind_mapper::{
    mappable, Mapper, MapperConfig, MapperError, MappingRegistry, NameMatching, TypeMap,
    TypePair,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Address {
    city: String,
    zip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct CustomerDto {
    id: u64,
    full_name: String,
    address: Address,
    cents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Customer {
    id: u64,
    name: String,
    city: String,
    balance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CamelCustomer {
    full_name: String,
    id: u64,
}

mappable!(default: Address, CustomerDto, Customer, CamelCustomer);

fn dto() -> CustomerDto {
    CustomerDto {
        id: 11,
        full_name: "Ada Lovelace".to_string(),
        address: Address {
            city: "London".to_string(),
            zip: "N1".to_string(),
        },
        cents: 1250,
    }
}

fn configured_mapper() -> Mapper {
    let registry = Arc::new(MappingRegistry::new());
    registry
        .configure(|cfg| {
            cfg.create_map::<CustomerDto, Customer>()
                .map_member("name", "full_name")
                .map_member("city", "address.city")
                .map_with("balance", "cents", |v| {
                    let cents = v
                        .as_i64()
                        .ok_or_else(|| anyhow::anyhow!("cents must be an integer"))?;
                    Ok(json!(cents as f64 / 100.0))
                })
                .ignore("id")
                .reverse_map();
        })
        .unwrap();
    Mapper::new(registry)
}

#[test]
fn test_explicit_members() {
    let mapper = configured_mapper();
    let customer: Customer = mapper.map(&dto()).unwrap();

    assert_eq!(
        customer,
        Customer {
            id: 0,
            name: "Ada Lovelace".to_string(),
            city: "London".to_string(),
            balance: 12.5,
        }
    );
}

#[test]
fn test_configured_pairs_are_not_registered_again() {
    let mapper = configured_mapper();
    let generation = mapper.registry().generation();

    let _: Customer = mapper.map(&dto()).unwrap();
    let _: Vec<Customer> = mapper.map(&vec![dto(), dto()]).unwrap();

    assert_eq!(mapper.registry().generation(), generation);
}

#[test]
fn test_reverse_map_swaps_renames() {
    let mapper = configured_mapper();
    assert!(mapper
        .registry()
        .contains(&TypePair::of::<Customer, CustomerDto>()));

    let back: CustomerDto = mapper
        .map(&Customer {
            id: 3,
            name: "Grace".to_string(),
            city: "Arlington".to_string(),
            balance: 1.0,
        })
        .unwrap();

    assert_eq!(back.full_name, "Grace");
    assert_eq!(back.id, 3);
    // Flattened and transformed members are not inverted.
    assert_eq!(back.address, Address::default());
    assert_eq!(back.cents, 0);
}

#[test]
fn test_transform_failure_propagates() {
    #[derive(Debug, Serialize, Deserialize)]
    struct BadCents {
        cents: String,
    }
    mappable!(BadCents);

    let registry = Arc::new(MappingRegistry::new());
    registry.add_map(
        TypeMap::builder::<BadCents, Customer>()
            .map_with("balance", "cents", |v| {
                v.as_f64()
                    .map(|f| json!(f))
                    .ok_or_else(|| anyhow::anyhow!("not a number: {}", v))
            })
            .build()
            .unwrap(),
    );
    let mapper = Mapper::new(registry);

    let err = mapper
        .map::<BadCents, Customer>(&BadCents {
            cents: "ten".to_string(),
        })
        .unwrap_err();

    match err {
        MapperError::Transform { member, source } => {
            assert_eq!(member, "balance");
            assert!(source.to_string().contains("not a number"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_strict_rule_lists_missing_members() {
    let registry = Arc::new(MappingRegistry::new());
    registry.add_map(
        TypeMap::builder::<CustomerDto, Customer>()
            .map_member("name", "full_name")
            .strict()
            .build()
            .unwrap(),
    );
    let mapper = Mapper::new(registry);

    let err = mapper.map::<CustomerDto, Customer>(&dto()).unwrap_err();

    match err {
        MapperError::UnmappedMembers { pair, mut members } => {
            members.sort();
            assert_eq!(pair, TypePair::of::<CustomerDto, Customer>());
            assert_eq!(members, vec!["balance", "city"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_relaxed_name_matching() {
    let mapper = Mapper::new(Arc::new(MappingRegistry::new()));
    let camel: CamelCustomer = mapper.map(&dto()).unwrap();
    assert_eq!(camel.full_name, "Ada Lovelace");
    assert_eq!(camel.id, 11);
}

#[test]
fn test_exact_name_matching() {
    let mapper = Mapper::with_config(
        Arc::new(MappingRegistry::new()),
        MapperConfig::default().with_name_matching(NameMatching::Exact),
    );
    let camel: CamelCustomer = mapper.map(&dto()).unwrap();
    assert_eq!(camel.full_name, "");
    assert_eq!(camel.id, 11);
}

#[test]
fn test_nested_members_merge_by_name() {
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Shipment {
        address: Address,
    }
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct CityOnly {
        city: String,
    }
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Partial {
        address: CityOnly,
    }
    mappable!(default: Shipment, Partial);

    let mapper = Mapper::new(Arc::new(MappingRegistry::new()));
    let mut shipment = Shipment {
        address: Address {
            city: "Old".to_string(),
            zip: "Z9".to_string(),
        },
    };

    mapper
        .map_into(
            &Partial {
                address: CityOnly {
                    city: "New".to_string(),
                },
            },
            &mut shipment,
        )
        .unwrap();

    assert_eq!(shipment.address.city, "New");
    assert_eq!(shipment.address.zip, "Z9");
}

#[test]
fn test_duplicate_member_rejected_by_configure() {
    let registry = MappingRegistry::new();
    let result = registry.configure(|cfg| {
        cfg.create_map::<CustomerDto, Customer>()
            .map_member("name", "full_name")
            .map_member("name", "id");
    });
    assert!(matches!(result, Err(MapperError::InvalidConfiguration(_))));
}
