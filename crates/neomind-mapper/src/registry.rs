//! Mapping registry.
//!
//! The registry holds every [`TypeMap`] known to a mapper, keyed by resolved
//! [`TypePair`]. It starts uninitialized; the first configuration, explicit or
//! lazy, initializes it.
//!
//! All mutation goes through one `parking_lot::RwLock`, and
//! [`MappingRegistry::ensure`] performs lookup and registration under a single
//! write guard so concurrent first-sight registrations never drop a rule.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;

use crate::config::RegistrationMode;
use crate::error::{MapperError, Result};
use crate::type_map::{MemberMap, TypeMap, TypeMapBuilder};
use crate::types::{Mappable, TypePair};

/// Result of a registry lookup.
#[derive(Debug, Clone)]
pub enum Lookup {
    /// The registry has never been configured.
    Uninitialized,
    /// The registry is configured but has no rule for the pair.
    Missing,
    Found(Arc<TypeMap>),
}

/// How [`MappingRegistry::ensure`] obtained its rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The rule was already registered.
    Existing,
    /// The registry was uninitialized and now holds only the new rule.
    Initialized,
    /// The rule was inserted next to the existing ones.
    Added,
    /// The registry was re-initialized with its previous rules plus the new one.
    Rebuilt { previous: usize },
}

#[derive(Debug, Default)]
struct RuleSet {
    rules: HashMap<TypePair, Arc<TypeMap>>,
    order: Vec<TypePair>,
}

impl RuleSet {
    fn from_rules(rules: impl IntoIterator<Item = Arc<TypeMap>>) -> Self {
        let mut set = RuleSet::default();
        for rule in rules {
            set.insert(rule);
        }
        set
    }

    fn insert(&mut self, rule: Arc<TypeMap>) -> bool {
        let pair = rule.pair();
        let added = self.rules.insert(pair, rule).is_none();
        if added {
            self.order.push(pair);
        }
        added
    }

    fn snapshot(&self) -> Vec<Arc<TypeMap>> {
        self.order
            .iter()
            .filter_map(|pair| self.rules.get(pair).cloned())
            .collect()
    }
}

#[derive(Debug, Default)]
struct State {
    rules: Option<RuleSet>,
    generation: u64,
}

impl State {
    fn lookup(&self, pair: &TypePair) -> Lookup {
        match &self.rules {
            None => Lookup::Uninitialized,
            Some(set) => match set.rules.get(pair) {
                Some(rule) => Lookup::Found(Arc::clone(rule)),
                None => Lookup::Missing,
            },
        }
    }

    fn initialize(&mut self, rules: RuleSet) {
        self.rules = Some(rules);
        self.generation += 1;
    }
}

/// Store of mapping rules keyed by resolved type pair.
#[derive(Debug, Default)]
pub struct MappingRegistry {
    state: RwLock<State>,
}

impl MappingRegistry {
    /// Create an uninitialized registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry initialized with `rules`.
    pub fn with_rules(rules: impl IntoIterator<Item = TypeMap>) -> Self {
        let registry = Self::new();
        registry.initialize(rules);
        registry
    }

    /// Whether the registry has been configured at least once.
    pub fn is_initialized(&self) -> bool {
        self.state.read().rules.is_some()
    }

    /// Incremented on every mutation.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .rules
            .as_ref()
            .map_or(0, |set| set.order.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lookup(&self, pair: &TypePair) -> Lookup {
        self.state.read().lookup(pair)
    }

    /// Find the rule for `pair`.
    ///
    /// Returns [`MapperError::RegistryUninitialized`] when the registry has never
    /// been configured.
    pub fn find_rule(&self, pair: &TypePair) -> Result<Option<Arc<TypeMap>>> {
        match self.lookup(pair) {
            Lookup::Uninitialized => Err(MapperError::RegistryUninitialized),
            Lookup::Missing => Ok(None),
            Lookup::Found(rule) => Ok(Some(rule)),
        }
    }

    pub fn contains(&self, pair: &TypePair) -> bool {
        matches!(self.lookup(pair), Lookup::Found(_))
    }

    /// Every registered rule in registration order.
    pub fn all_rules(&self) -> Vec<Arc<TypeMap>> {
        self.state
            .read()
            .rules
            .as_ref()
            .map(RuleSet::snapshot)
            .unwrap_or_default()
    }

    /// Every registered pair in registration order.
    pub fn pairs(&self) -> Vec<TypePair> {
        self.state
            .read()
            .rules
            .as_ref()
            .map(|set| set.order.clone())
            .unwrap_or_default()
    }

    /// Replace every rule with `rules`.
    pub fn initialize(&self, rules: impl IntoIterator<Item = TypeMap>) {
        let set = RuleSet::from_rules(rules.into_iter().map(Arc::new));
        let count = set.order.len();
        self.state.write().initialize(set);
        tracing::debug!(rules = count, "mapping registry initialized");
    }

    /// Replace every rule with the ones declared in `configure`.
    pub fn configure<F>(&self, configure: F) -> Result<()>
    where
        F: FnOnce(&mut MappingConfiguration),
    {
        let mut config = MappingConfiguration::default();
        configure(&mut config);
        let rules = config.build()?;
        self.initialize(rules);
        Ok(())
    }

    /// Add or replace the rule for `rule.pair()`.
    ///
    /// An uninitialized registry becomes initialized with just this rule.
    pub fn add_map(&self, rule: TypeMap) {
        let pair = rule.pair();
        let mut state = self.state.write();
        let rule = Arc::new(rule);
        match state.rules.as_mut() {
            Some(set) => {
                if !set.insert(Arc::clone(&rule)) {
                    tracing::debug!(%pair, "mapping rule replaced");
                }
            }
            None => state.rules = Some(RuleSet::from_rules([rule])),
        }
        state.generation += 1;
    }

    /// Return the rule for `pair`, registering `create()` first if needed.
    ///
    /// Lookup and registration happen under one write guard, so two callers
    /// racing on unseen pairs both end up registered.
    pub fn ensure<F>(
        &self,
        pair: TypePair,
        mode: RegistrationMode,
        create: F,
    ) -> (Arc<TypeMap>, Registration)
    where
        F: FnOnce() -> TypeMap,
    {
        if let Lookup::Found(rule) = self.lookup(&pair) {
            return (rule, Registration::Existing);
        }

        let mut state = self.state.write();
        let registration = match state.lookup(&pair) {
            Lookup::Found(rule) => return (rule, Registration::Existing),
            Lookup::Uninitialized => {
                let rule = Arc::new(create());
                state.initialize(RuleSet::from_rules([Arc::clone(&rule)]));
                (rule, Registration::Initialized)
            }
            Lookup::Missing => {
                let rule = Arc::new(create());
                match mode {
                    RegistrationMode::Additive => {
                        if let Some(set) = state.rules.as_mut() {
                            set.insert(Arc::clone(&rule));
                        }
                        state.generation += 1;
                        (rule, Registration::Added)
                    }
                    RegistrationMode::Rebuild => {
                        let mut rules = state
                            .rules
                            .as_ref()
                            .map(RuleSet::snapshot)
                            .unwrap_or_default();
                        let previous = rules.len();
                        rules.push(Arc::clone(&rule));
                        state.initialize(RuleSet::from_rules(rules));
                        (rule, Registration::Rebuilt { previous })
                    }
                }
            }
        };
        drop(state);

        tracing::debug!(%pair, registration = ?registration.1, "mapping rule registered");
        registration
    }

    /// Drop every rule and return to the uninitialized state.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.rules = None;
        state.generation += 1;
    }
}

/// Rules collected by [`MappingRegistry::configure`].
#[derive(Debug, Default)]
pub struct MappingConfiguration {
    builders: Vec<TypeMapBuilder>,
    reverse: Vec<usize>,
}

impl MappingConfiguration {
    /// Declare a rule for `S -> D`, configured through the returned handle.
    pub fn create_map<S: Mappable, D: Mappable>(&mut self) -> MapDeclaration<'_> {
        self.builders.push(TypeMap::builder::<S, D>());
        let index = self.builders.len() - 1;
        MapDeclaration {
            config: self,
            index,
        }
    }

    /// Add an already built rule.
    pub fn add(&mut self, rule: TypeMap) {
        self.builders.push(TypeMapBuilder::from(rule));
    }

    fn build(self) -> Result<Vec<TypeMap>> {
        let mut rules = Vec::with_capacity(self.builders.len() + self.reverse.len());
        // Generated reverse rules go first so a forward declaration of the same
        // pair replaces them.
        for index in &self.reverse {
            rules.push(self.builders[*index].reverse()?);
        }
        for builder in self.builders {
            rules.push(builder.build()?);
        }
        Ok(rules)
    }
}

/// Handle returned by [`MappingConfiguration::create_map`].
pub struct MapDeclaration<'a> {
    config: &'a mut MappingConfiguration,
    index: usize,
}

impl MapDeclaration<'_> {
    fn builder(&mut self) -> &mut TypeMapBuilder {
        &mut self.config.builders[self.index]
    }

    pub fn map_member(mut self, destination: &str, source_path: &str) -> Self {
        self.builder()
            .push_member(MemberMap::new(destination, source_path));
        self
    }

    pub fn map_with<F>(mut self, destination: &str, source_path: &str, transform: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.builder()
            .push_member(MemberMap::new(destination, source_path).with_transform(transform));
        self
    }

    /// Fill `destination` from `source_path`, creating new nested elements
    /// from the default of `E`.
    pub fn map_nested<E: Mappable>(mut self, destination: &str, source_path: &str) -> Self {
        self.builder().push_member(
            MemberMap::new(destination, source_path).with_template(E::element_template()),
        );
        self
    }

    pub fn ignore(mut self, destination: &str) -> Self {
        self.builder().push_ignored(destination);
        self
    }

    pub fn strict(mut self) -> Self {
        self.builder().set_strict();
        self
    }

    /// Also register the opposite direction.
    pub fn reverse_map(self) -> Self {
        if !self.config.reverse.contains(&self.index) {
            self.config.reverse.push(self.index);
        }
        self
    }
}

/// Process-wide registry used by [`global_mapper`](crate::global_mapper).
static GLOBAL_REGISTRY: Lazy<Arc<MappingRegistry>> = Lazy::new(|| Arc::new(MappingRegistry::new()));

/// Get the process-wide registry.
pub fn global_registry() -> Arc<MappingRegistry> {
    Arc::clone(&GLOBAL_REGISTRY)
}
