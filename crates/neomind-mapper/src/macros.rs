//! Declarative macros for the mapper crate.

/// Implement [`Mappable`](crate::Mappable) for one or more plain types.
///
/// With the `default:` prefix the types must also implement `Default`; their
/// serialized default then seeds destination elements created while mapping
/// collections, so members with no source keep their default value.
///
/// # Example
///
/// ```rust
/// use neomind_mapper::mappable;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct PersonDto { name: String }
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct Person { name: String, age: u32 }
///
/// mappable!(PersonDto);
/// mappable!(default: Person);
/// ```
#[macro_export]
macro_rules! mappable {
    (default: $($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Mappable for $ty {
                fn element_template() -> ::std::option::Option<$crate::__private::Value> {
                    $crate::__private::to_value(<$ty as ::std::default::Default>::default()).ok()
                }
            }
        )+
    };
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Mappable for $ty {}
        )+
    };
}
