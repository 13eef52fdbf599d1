//! Instance Resolution
//!
//! The navigation service does not construct anything itself. It asks an
//! [`InstanceResolver`] (the application's dependency-resolution context) for
//! an instance matching the locator.

use std::collections::HashMap;
use std::sync::Arc;
use anyhow::{bail, Result};
use async_trait::async_trait;
use log::trace;

use crate::navigation::context::Navigable;
use crate::navigation::locator::Locator;

/// External resolution context supplying instances by type
#[async_trait]
pub trait InstanceResolver: Send + Sync {
    /// Produce the instance a locator refers to
    async fn resolve(&self, locator: &Locator) -> Result<Arc<dyn Navigable>>;
}

/// Constructor registered for a type id
pub type InstanceFactory = Arc<dyn Fn(&Locator) -> Result<Arc<dyn Navigable>> + Send + Sync>;

/// Resolver backed by a table of type id -> factory
#[derive(Default, Clone)]
pub struct TypeRegistry {
    factories: HashMap<String, InstanceFactory>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `type_id`, replacing any previous one
    pub fn register<S, F>(&mut self, type_id: S, factory: F) -> &mut Self
    where
        S: Into<String>,
        F: Fn(&Locator) -> Result<Arc<dyn Navigable>> + Send + Sync + 'static,
    {
        self.factories.insert(type_id.into(), Arc::new(factory));
        self
    }

    pub fn is_registered(&self, type_id: &str) -> bool {
        self.factories.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[async_trait]
impl InstanceResolver for TypeRegistry {
    async fn resolve(&self, locator: &Locator) -> Result<Arc<dyn Navigable>> {
        trace!("Resolving {} from type registry", locator);
        match self.factories.get(locator.type_id()) {
            Some(factory) => factory(locator),
            None => bail!(
                "No type '{}' is registered in module '{}'",
                locator.type_id(),
                locator.module_id()
            ),
        }
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&String> = self.factories.keys().collect();
        types.sort();
        f.debug_struct("TypeRegistry").field("types", &types).finish()
    }
}
