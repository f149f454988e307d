//! Mapping dispatcher.
//!
//! [`Mapper`] resolves the type pair of a call, makes sure the registry has a
//! rule for it and runs the copy.

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::config::MapperConfig;
use crate::error::{MapperError, Result};
use crate::registry::{global_registry, MappingRegistry, Registration};
use crate::type_map::TypeMap;
use crate::types::{Mappable, TypePair};

/// Maps values between types using the rules of a [`MappingRegistry`].
#[derive(Debug, Clone)]
pub struct Mapper {
    registry: Arc<MappingRegistry>,
    config: MapperConfig,
}

impl Mapper {
    /// Create a mapper over `registry` with default options.
    pub fn new(registry: Arc<MappingRegistry>) -> Self {
        Self::with_config(registry, MapperConfig::default())
    }

    pub fn with_config(registry: Arc<MappingRegistry>, config: MapperConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<MappingRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Map `source` onto a default-constructed `D`.
    pub fn map<S, D>(&self, source: &S) -> Result<D>
    where
        S: Mappable,
        D: Mappable + Default,
    {
        let mut destination = D::default();
        self.map_into(source, &mut destination)?;
        Ok(destination)
    }

    /// Map `source` onto an existing destination.
    ///
    /// Destination members without a source keep their current value. On error
    /// the destination is left untouched.
    ///
    /// A `None` source or destination is a [`MapperError::NullArgument`]. Unit
    /// structs and non-finite floats serialize to null too but are mapped as
    /// present values. A non-finite float has no serialized form, so the
    /// destination number it would overwrite keeps its current value.
    pub fn map_into<S, D>(&self, source: &S, destination: &mut D) -> Result<()>
    where
        S: Mappable,
        D: Mappable,
    {
        if source.is_absent() {
            return Err(MapperError::NullArgument("source".to_string()));
        }
        if destination.is_absent() {
            return Err(MapperError::NullArgument("destination".to_string()));
        }
        let source = serde_json::to_value(source)?;
        let current = serde_json::to_value(&*destination)?;

        let pair = TypePair::of::<S, D>();
        let rule = self.rule_for(pair);
        let mapped = rule.apply(
            &source,
            current,
            D::element_template().as_ref(),
            self.config.name_matching,
        )?;

        *destination = serde_json::from_value(mapped).map_err(|e| {
            tracing::debug!(%pair, error = %e, "mapped value does not fit destination");
            MapperError::mapping(pair, e.to_string())
        })?;
        Ok(())
    }

    /// Map with explicitly optional arguments.
    ///
    /// A missing source or destination fails before anything is read.
    pub fn map_nullable<S, D>(&self, source: Option<&S>, destination: Option<D>) -> Result<D>
    where
        S: Mappable,
        D: Mappable,
    {
        let source = source.ok_or_else(|| MapperError::NullArgument("source".to_string()))?;
        let mut destination =
            destination.ok_or_else(|| MapperError::NullArgument("destination".to_string()))?;
        self.map_into(source, &mut destination)?;
        Ok(destination)
    }

    /// Rule for `pair`, registering a name-convention rule on first sight.
    pub fn rule_for(&self, pair: TypePair) -> Arc<TypeMap> {
        let strict = self.config.strict_members;
        let (rule, registration) = self.registry.ensure(pair, self.config.registration, || {
            TypeMap::new(pair).with_strict(strict)
        });
        if let Registration::Rebuilt { previous } = registration {
            tracing::info!(%pair, previous, "mapping registry rebuilt for new type pair");
        }
        rule
    }

    /// Map a raw value with the rule registered for `S -> D`.
    pub fn map_value<S, D>(&self, source: &Value) -> Result<Value>
    where
        S: Mappable,
        D: Mappable,
    {
        let rule = self.rule_for(TypePair::of::<S, D>());
        let template = D::element_template();
        let start = match (source, &template) {
            (Value::Array(_), _) | (_, None) => Value::Null,
            (_, Some(template)) => template.clone(),
        };
        rule.apply(source, start, template.as_ref(), self.config.name_matching)
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(Arc::new(MappingRegistry::new()))
    }
}

/// Process-wide mapper over the global registry.
static GLOBAL_MAPPER: Lazy<Mapper> = Lazy::new(|| {
    let config = MapperConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring mapper environment overrides");
        MapperConfig::default()
    });
    Mapper::with_config(global_registry(), config)
});

/// Get the process-wide mapper.
pub fn global_mapper() -> &'static Mapper {
    &GLOBAL_MAPPER
}

/// Mapping through the process-wide mapper.
///
/// Implemented for every [`Mappable`] type.
pub trait MapTo: Mappable {
    /// Map `self` onto a default-constructed `D`.
    fn map_to<D>(&self) -> Result<D>
    where
        D: Mappable + Default,
    {
        global_mapper().map(self)
    }

    /// Map `self` onto an existing destination.
    fn map_onto<D>(&self, destination: &mut D) -> Result<()>
    where
        D: Mappable,
    {
        global_mapper().map_into(self, destination)
    }
}

impl<T: Mappable> MapTo for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Source {
        name: String,
        count: u32,
    }

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Target {
        name: String,
        count: u32,
        note: String,
    }

    crate::mappable!(default: Source, Target);

    #[test]
    fn test_map_registers_once() {
        let mapper = Mapper::default();
        let source = Source {
            name: "a".into(),
            count: 2,
        };
        let first: Target = mapper.map(&source).unwrap();
        let generation = mapper.registry().generation();
        let second: Target = mapper.map(&source).unwrap();

        assert_eq!(first, second);
        assert_eq!(mapper.registry().generation(), generation);
        assert_eq!(mapper.registry().len(), 1);
    }

    #[test]
    fn test_map_into_keeps_unmatched() {
        let mapper = Mapper::default();
        let mut target = Target {
            note: "keep".into(),
            ..Default::default()
        };
        mapper
            .map_into(
                &Source {
                    name: "b".into(),
                    count: 5,
                },
                &mut target,
            )
            .unwrap();
        assert_eq!(target.name, "b");
        assert_eq!(target.count, 5);
        assert_eq!(target.note, "keep");
    }

    #[test]
    fn test_null_arguments_fail_before_registration() {
        let mapper = Mapper::default();
        let err = mapper
            .map_nullable::<Source, Target>(None, Some(Target::default()))
            .unwrap_err();
        assert!(matches!(err, MapperError::NullArgument(ref arg) if arg == "source"));

        let err = mapper
            .map_nullable::<Source, Target>(Some(&Source::default()), None)
            .unwrap_err();
        assert!(matches!(err, MapperError::NullArgument(ref arg) if arg == "destination"));

        let err = mapper.map::<Option<Source>, Target>(&None).unwrap_err();
        assert!(err.is_null_argument());

        assert!(!mapper.registry().is_initialized());
    }

    #[test]
    fn test_map_value_uses_template() {
        let mapper = Mapper::default();
        let out = mapper
            .map_value::<Source, Target>(&serde_json::json!({"name": "x"}))
            .unwrap();
        assert_eq!(out, serde_json::json!({"name": "x", "count": 0, "note": ""}));
    }
}
