//! Object-to-object mapping for NeoMind.
//!
//! This crate copies member values from a source value onto a destination of a
//! different type. Rules are kept in a [`MappingRegistry`] keyed by the resolved
//! `(source, destination)` type pair and are registered lazily the first time a
//! pair is mapped. Container types (`Vec<T>`, sets, `Option<T>`) resolve to their
//! element type, so one rule serves both single values and collections.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use neomind_mapper::{mappable, Mapper, MappingRegistry, TypePair};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct PersonDto { name: String, age: u32 }
//!
//! #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
//! struct Person { name: String, age: u32 }
//!
//! mappable!(PersonDto);
//! mappable!(default: Person);
//!
//! # fn main() -> neomind_mapper::Result<()> {
//! let mapper = Mapper::new(Arc::new(MappingRegistry::new()));
//! let person: Person = mapper.map(&PersonDto { name: "Alice".into(), age: 30 })?;
//! assert_eq!(person, Person { name: "Alice".into(), age: 30 });
//!
//! let people: Vec<Person> = mapper.map(&vec![PersonDto { name: "Bob".into(), age: 7 }])?;
//! assert_eq!(people.len(), 1);
//! assert_eq!(mapper.registry().pairs(), vec![TypePair::of::<PersonDto, Person>()]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod macros;
pub mod registry;
pub mod type_map;
pub mod types;

pub use config::{MapperConfig, NameMatching, RegistrationMode};
pub use dispatcher::{global_mapper, MapTo, Mapper};
pub use error::{MapperError, Result};
pub use registry::{
    global_registry, Lookup, MapDeclaration, MappingConfiguration, MappingRegistry, Registration,
};
pub use type_map::{MemberMap, MemberTransform, TypeMap, TypeMapBuilder};
pub use types::{Mappable, TypeKey, TypePair};

#[doc(hidden)]
pub mod __private {
    pub use serde_json::{to_value, Value};
}

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::config::{MapperConfig, NameMatching, RegistrationMode};
    pub use crate::dispatcher::{global_mapper, MapTo, Mapper};
    pub use crate::error::{MapperError, Result};
    pub use crate::mappable;
    pub use crate::registry::MappingRegistry;
    pub use crate::type_map::{TypeMap, TypeMapBuilder};
    pub use crate::types::{Mappable, TypePair};
}
