//! Type identity and container unwrapping.
//!
//! Every value that goes through the mapper implements [`Mappable`]. The trait
//! yields the *resolved* [`TypeKey`] of a type: generic containers report the key
//! of their element type, recursively, so `Vec<Vec<PersonDto>>` and `PersonDto`
//! share one rule.

use std::any::TypeId;
use std::collections::{BTreeSet, HashSet, LinkedList, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Identity of a single Rust type.
///
/// Equality and hashing only look at the [`TypeId`]; the name is kept for
/// diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key of `T` itself, without any unwrapping.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Underlying type id.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type name as reported by the compiler.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without module path or generic arguments.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Resolved (source, destination) key of a mapping rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypePair {
    pub source: TypeKey,
    pub destination: TypeKey,
}

impl TypePair {
    pub fn new(source: TypeKey, destination: TypeKey) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Pair for mapping `S` onto `D`, after container unwrapping.
    pub fn of<S: Mappable, D: Mappable>() -> Self {
        Self::new(S::type_key(), D::type_key())
    }

    /// The same pair with source and destination swapped.
    pub fn reversed(&self) -> Self {
        Self::new(self.destination, self.source)
    }
}

impl fmt::Display for TypePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

/// A type the mapper can read from or write to.
///
/// Plain structs use the provided methods, usually through the
/// [`mappable!`](crate::mappable) macro. Containers override [`Mappable::type_key`]
/// to forward to their element type.
pub trait Mappable: Serialize + DeserializeOwned + 'static {
    /// Resolved key used for rule lookup.
    fn type_key() -> TypeKey {
        TypeKey::of::<Self>()
    }

    /// Serialized default of the innermost element, if the type has one.
    ///
    /// Used as the starting point for destination elements that do not exist yet.
    fn element_template() -> Option<Value> {
        None
    }

    /// Whether this value stands for a missing argument.
    ///
    /// Only `None` is absent. Unit structs and non-finite floats also serialize
    /// to null but are present values.
    fn is_absent(&self) -> bool {
        false
    }
}

macro_rules! scalar_mappable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Mappable for $ty {
                fn element_template() -> Option<Value> {
                    serde_json::to_value(<$ty>::default()).ok()
                }
            }
        )*
    };
}

scalar_mappable!(
    String, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32,
    f64,
);

impl Mappable for Value {}

impl<T: Mappable> Mappable for Vec<T> {
    fn type_key() -> TypeKey {
        T::type_key()
    }

    fn element_template() -> Option<Value> {
        T::element_template()
    }
}

impl<T: Mappable> Mappable for VecDeque<T> {
    fn type_key() -> TypeKey {
        T::type_key()
    }

    fn element_template() -> Option<Value> {
        T::element_template()
    }
}

impl<T: Mappable> Mappable for LinkedList<T> {
    fn type_key() -> TypeKey {
        T::type_key()
    }

    fn element_template() -> Option<Value> {
        T::element_template()
    }
}

impl<T: Mappable> Mappable for Box<[T]> {
    fn type_key() -> TypeKey {
        T::type_key()
    }

    fn element_template() -> Option<Value> {
        T::element_template()
    }
}

impl<T: Mappable + Ord> Mappable for BTreeSet<T> {
    fn type_key() -> TypeKey {
        T::type_key()
    }

    fn element_template() -> Option<Value> {
        T::element_template()
    }
}

impl<T: Mappable + Eq + Hash> Mappable for HashSet<T> {
    fn type_key() -> TypeKey {
        T::type_key()
    }

    fn element_template() -> Option<Value> {
        T::element_template()
    }
}

// `None` serializes to null and is rejected as a null argument.
impl<T: Mappable> Mappable for Option<T> {
    fn type_key() -> TypeKey {
        T::type_key()
    }

    fn element_template() -> Option<Value> {
        T::element_template()
    }

    fn is_absent(&self) -> bool {
        self.as_ref().is_none_or(T::is_absent)
    }
}
