//! Mapping rules and the member-wise copy.
//!
//! A [`TypeMap`] is the rule for one [`TypePair`]. Members are read and written
//! through the `serde_json::Value` object model:
//!
//! ```text
//! source ──serialize──▶ Value ──TypeMap::apply──▶ Value ──deserialize──▶ destination
//!                                   ▲
//!                   destination ──serialize (starting shape)
//! ```
//!
//! Members without an explicit [`MemberMap`] are matched by name under the
//! mapper's [`NameMatching`] mode.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::NameMatching;
use crate::error::{MapperError, Result};
use crate::types::{Mappable, TypePair};

/// User-supplied conversion applied to a single member value.
pub type MemberTransform = Arc<dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync>;

/// Explicit descriptor for one destination member.
#[derive(Clone)]
pub struct MemberMap {
    /// Destination member name.
    pub destination: String,
    /// Dot-separated path into the source (`address.city`).
    pub source_path: String,
    pub transform: Option<MemberTransform>,
    /// Starting shape for nested destination elements that do not exist yet.
    pub template: Option<Value>,
}

impl MemberMap {
    pub fn new(destination: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            source_path: source_path.into(),
            transform: None,
            template: None,
        }
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn with_template(mut self, template: Option<Value>) -> Self {
        self.template = template;
        self
    }

    fn resolve(&self, source: &Value) -> Result<Option<Value>> {
        let Some(value) = lookup_path(source, &self.source_path) else {
            return Ok(None);
        };
        match &self.transform {
            Some(transform) => transform(value).map(Some).map_err(|e| MapperError::Transform {
                member: self.destination.clone(),
                source: e,
            }),
            None => Ok(Some(value.clone())),
        }
    }
}

impl fmt::Debug for MemberMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberMap")
            .field("destination", &self.destination)
            .field("source_path", &self.source_path)
            .field("transform", &self.transform.is_some())
            .field("template", &self.template)
            .finish()
    }
}

/// Rule for mapping one resolved source type onto one resolved destination type.
#[derive(Debug, Clone)]
pub struct TypeMap {
    pair: TypePair,
    members: Vec<MemberMap>,
    ignored: HashSet<String>,
    strict: bool,
}

impl TypeMap {
    /// Name-convention rule with no explicit members.
    pub fn new(pair: TypePair) -> Self {
        Self {
            pair,
            members: Vec::new(),
            ignored: HashSet::new(),
            strict: false,
        }
    }

    /// Start configuring a rule for `S -> D`.
    pub fn builder<S: Mappable, D: Mappable>() -> TypeMapBuilder {
        TypeMapBuilder::new(TypePair::of::<S, D>())
    }

    pub fn pair(&self) -> TypePair {
        self.pair
    }

    pub fn members(&self) -> &[MemberMap] {
        &self.members
    }

    pub fn is_ignored(&self, member: &str) -> bool {
        self.ignored.contains(member)
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Whether the rule has anything beyond the name convention.
    pub fn is_explicit(&self) -> bool {
        !self.members.is_empty() || !self.ignored.is_empty() || self.strict
    }

    pub(crate) fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn member_for(&self, destination: &str) -> Option<&MemberMap> {
        self.members.iter().find(|m| m.destination == destination)
    }

    /// Copy `source` onto `destination` and return the populated value.
    ///
    /// `template` seeds destination elements that have to be created while
    /// mapping arrays.
    pub fn apply(
        &self,
        source: &Value,
        destination: Value,
        template: Option<&Value>,
        matching: NameMatching,
    ) -> Result<Value> {
        match source {
            // Present values without a serialized form: unit structs and
            // non-finite floats.
            Value::Null => Ok(match destination {
                number @ Value::Number(_) => number,
                _ => Value::Null,
            }),
            Value::Array(items) => {
                let mut existing = match destination {
                    Value::Array(existing) => existing.into_iter(),
                    Value::Null => Vec::new().into_iter(),
                    other => {
                        return Err(MapperError::mapping(
                            self.pair,
                            format!("cannot map a sequence onto {}", kind(&other)),
                        ))
                    }
                };
                let mut mapped = Vec::with_capacity(items.len());
                for item in items {
                    if item.is_null() {
                        existing.next();
                        mapped.push(Value::Null);
                        continue;
                    }
                    let start = match existing.next() {
                        Some(current) => current,
                        // Nested sequences are unwrapped further before the template applies.
                        None if item.is_array() => Value::Null,
                        None => template
                            .cloned()
                            .unwrap_or_else(|| Value::Object(Map::new())),
                    };
                    mapped.push(self.apply(item, start, template, matching)?);
                }
                Ok(Value::Array(mapped))
            }
            Value::Object(fields) => match destination {
                Value::Object(target) => self.copy_members(fields, target, matching),
                Value::Null => self.copy_members(fields, Map::new(), matching),
                other => Err(MapperError::mapping(
                    self.pair,
                    format!("cannot map an object onto {}", kind(&other)),
                )),
            },
            scalar => Ok(scalar.clone()),
        }
    }

    fn copy_members(
        &self,
        source: &Map<String, Value>,
        mut target: Map<String, Value>,
        matching: NameMatching,
    ) -> Result<Value> {
        let source_value = Value::Object(source.clone());
        let mut candidates: Vec<String> = if target.is_empty() {
            source.keys().cloned().collect()
        } else {
            target.keys().cloned().collect()
        };
        for member in &self.members {
            if !candidates.contains(&member.destination) {
                candidates.push(member.destination.clone());
            }
        }

        let mut unmapped = Vec::new();
        for name in candidates {
            if self.is_ignored(&name) {
                continue;
            }

            if let Some(member) = self.member_for(&name) {
                match member.resolve(&source_value)? {
                    Some(value) => {
                        let merged = merge_value(
                            target.remove(&name),
                            &value,
                            member.template.as_ref(),
                            matching,
                        );
                        target.insert(name, merged);
                    }
                    None => unmapped.push(name),
                }
                continue;
            }

            match find_member(source, &name, matching) {
                Some(value) => {
                    let merged = merge_value(target.remove(&name), value, None, matching);
                    target.insert(name, merged);
                }
                None => unmapped.push(name),
            }
        }

        if self.strict && !unmapped.is_empty() {
            return Err(MapperError::UnmappedMembers {
                pair: self.pair,
                members: unmapped,
            });
        }
        if !unmapped.is_empty() {
            tracing::trace!(pair = %self.pair, members = ?unmapped, "destination members left unmapped");
        }
        Ok(Value::Object(target))
    }
}

/// Builder for an explicitly configured [`TypeMap`].
#[derive(Debug, Clone)]
pub struct TypeMapBuilder {
    map: TypeMap,
}

impl TypeMapBuilder {
    pub fn new(pair: TypePair) -> Self {
        Self {
            map: TypeMap::new(pair),
        }
    }

    pub fn pair(&self) -> TypePair {
        self.map.pair
    }

    /// Fill `destination` from the value at `source_path`.
    pub fn map_member(mut self, destination: &str, source_path: &str) -> Self {
        self.push_member(MemberMap::new(destination, source_path));
        self
    }

    /// Fill `destination` from `source_path`, converted by `transform`.
    pub fn map_with<F>(mut self, destination: &str, source_path: &str, transform: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.push_member(MemberMap::new(destination, source_path).with_transform(transform));
        self
    }

    /// Fill `destination` from `source_path`, creating new nested elements
    /// from the default of `E`.
    pub fn map_nested<E: Mappable>(mut self, destination: &str, source_path: &str) -> Self {
        self.push_member(
            MemberMap::new(destination, source_path).with_template(E::element_template()),
        );
        self
    }

    /// Never write `destination`.
    pub fn ignore(mut self, destination: &str) -> Self {
        self.push_ignored(destination);
        self
    }

    /// Fail when a destination member has no source.
    pub fn strict(mut self) -> Self {
        self.set_strict();
        self
    }

    pub(crate) fn push_member(&mut self, member: MemberMap) {
        self.map.members.push(member);
    }

    pub(crate) fn push_ignored(&mut self, destination: &str) {
        self.map.ignored.insert(destination.to_string());
    }

    pub(crate) fn set_strict(&mut self) {
        self.map.strict = true;
    }

    /// Validate the descriptors and produce the rule.
    pub fn build(self) -> Result<TypeMap> {
        self.validate()?;
        Ok(self.map)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for member in &self.map.members {
            if member.destination.is_empty() {
                return Err(MapperError::InvalidConfiguration(format!(
                    "{}: empty destination member name",
                    self.map.pair
                )));
            }
            if !seen.insert(member.destination.as_str()) {
                return Err(MapperError::InvalidConfiguration(format!(
                    "{}: member '{}' configured twice",
                    self.map.pair, member.destination
                )));
            }
            if self.map.ignored.contains(&member.destination) {
                return Err(MapperError::InvalidConfiguration(format!(
                    "{}: member '{}' is both mapped and ignored",
                    self.map.pair, member.destination
                )));
            }
        }
        Ok(())
    }

    /// Rule for the opposite direction.
    ///
    /// Plain renames are swapped. Members with a transform or a nested source
    /// path cannot be inverted and fall back to the name convention. When
    /// several members read the same source, the first one is inverted.
    pub fn reverse(&self) -> Result<TypeMap> {
        let mut reversed = TypeMapBuilder::new(self.map.pair.reversed());
        let mut seen = HashSet::new();
        for member in &self.map.members {
            if member.transform.is_some() || member.source_path.contains('.') {
                continue;
            }
            if !seen.insert(member.source_path.as_str()) {
                continue;
            }
            reversed = reversed.map_member(&member.source_path, &member.destination);
        }
        reversed.build()
    }
}

impl From<TypeMap> for TypeMapBuilder {
    fn from(map: TypeMap) -> Self {
        Self { map }
    }
}

fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn find_member<'a>(
    source: &'a Map<String, Value>,
    name: &str,
    matching: NameMatching,
) -> Option<&'a Value> {
    if let Some(value) = source.get(name) {
        return Some(value);
    }
    if matching == NameMatching::Exact {
        return None;
    }
    let wanted = matching.normalize(name);
    source
        .iter()
        .find(|(key, _)| matching.normalize(key) == wanted)
        .map(|(_, value)| value)
}

fn merge_by_name(
    source: &Map<String, Value>,
    mut target: Map<String, Value>,
    matching: NameMatching,
) -> Value {
    let names: Vec<String> = if target.is_empty() {
        source.keys().cloned().collect()
    } else {
        target.keys().cloned().collect()
    };
    for name in names {
        if let Some(value) = find_member(source, &name, matching) {
            let merged = merge_value(target.remove(&name), value, None, matching);
            target.insert(name, merged);
        }
    }
    Value::Object(target)
}

/// Merge one source member onto the current destination member.
///
/// Objects merge by name and sequences element by element. New elements start
/// from `template` when one is known.
fn merge_value(
    existing: Option<Value>,
    value: &Value,
    template: Option<&Value>,
    matching: NameMatching,
) -> Value {
    match (existing, value) {
        // Non-finite floats serialize to null.
        (Some(Value::Number(current)), Value::Null) => Value::Number(current),
        (Some(Value::Object(current)), Value::Object(nested)) => {
            merge_by_name(nested, current, matching)
        }
        (None | Some(Value::Null), Value::Object(nested)) => match template {
            Some(Value::Object(shape)) => merge_by_name(nested, shape.clone(), matching),
            _ => value.clone(),
        },
        (existing, Value::Array(items)) => {
            let mut current = match existing {
                Some(Value::Array(current)) => current.into_iter(),
                _ => Vec::new().into_iter(),
            };
            Value::Array(
                items
                    .iter()
                    .map(|item| merge_value(current.next(), item, template, matching))
                    .collect(),
            )
        }
        (_, value) => value.clone(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "an object",
    }
}
