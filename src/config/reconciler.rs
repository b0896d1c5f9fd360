//! # Plugin Reconciliation
//!
//! Pure functions deciding which registrars a pool should carry and whether
//! its registry must be cleared and reapplied after a configuration refresh.
//!
//! ## Rules
//!
//! - Tiers merge field by field; the custom tier wins
//! - Only effective `enable`, `includes` and `excludes` take part in the
//!   changed test; overlays never trigger a reapply
//! - `enable == false` or `excludes == "*"` select nothing
//! - `includes == "*"` starts from the whole universe
//! - Ids absent from the universe are dropped silently

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::registry::Registrar;

use super::{IdSelection, PluginProperties};

/// Registrars and plugins a pool can be populated from
pub trait PluginUniverse: Send + Sync {
    /// Every id that can be resolved, registrar ids and plugin ids alike
    fn known_ids(&self) -> BTreeSet<String>;

    /// Resolve an id to something that can populate a registry
    fn resolve(&self, id: &str) -> Option<Arc<dyn Registrar>>;
}

/// Outcome of comparing the previous and current properties of a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Properties to use from now on
    pub properties: Option<PluginProperties>,
    /// Whether the pool's registry should be cleared and reapplied
    pub changed: bool,
}

/// Merge the default and custom tiers; `None` when neither is configured
pub fn merge_tiers(
    default: Option<&PluginProperties>,
    custom: Option<&PluginProperties>,
) -> Option<PluginProperties> {
    match (default, custom) {
        (None, None) => None,
        (Some(default), None) => Some(default.clone()),
        (None, Some(custom)) => Some(custom.clone()),
        (Some(default), Some(custom)) => {
            let mut plugins = default.plugins.clone();
            for (plugin_id, overlay) in &custom.plugins {
                let merged = plugins.entry(plugin_id.clone()).or_default();
                for (key, value) in overlay {
                    merged.insert(key.clone(), value.clone());
                }
            }
            Some(PluginProperties {
                enable: custom.enable.or(default.enable),
                includes: custom.includes.clone().or_else(|| default.includes.clone()),
                excludes: custom.excludes.clone().or_else(|| default.excludes.clone()),
                plugins,
            })
        }
    }
}

/// Whether two snapshots select plugins differently
pub fn is_changed(before: &PluginProperties, after: &PluginProperties) -> bool {
    before.effective_enable() != after.effective_enable()
        || before.effective_includes() != after.effective_includes()
        || before.effective_excludes() != after.effective_excludes()
}

/// Decide the properties to carry forward and whether a reapply is needed
///
/// A pool that loses its configuration keeps the previous properties and is
/// left untouched; a pool that gains one is always (re)applied.
pub fn reconcile(
    previous: Option<&PluginProperties>,
    current: Option<&PluginProperties>,
) -> Reconciliation {
    match (previous, current) {
        (None, None) => Reconciliation {
            properties: None,
            changed: false,
        },
        (None, Some(current)) => Reconciliation {
            properties: Some(current.clone()),
            changed: true,
        },
        (Some(previous), None) => Reconciliation {
            properties: Some(previous.clone()),
            changed: false,
        },
        (Some(previous), Some(current)) => Reconciliation {
            properties: Some(current.clone()),
            changed: is_changed(previous, current),
        },
    }
}

/// Ids selected by `properties` out of `known_ids`
pub fn effective_ids(properties: &PluginProperties, known_ids: &BTreeSet<String>) -> BTreeSet<String> {
    if !properties.effective_enable() {
        return BTreeSet::new();
    }

    let excludes = IdSelection::parse(properties.effective_excludes());
    if excludes == IdSelection::All {
        return BTreeSet::new();
    }

    let included: BTreeSet<String> = match IdSelection::parse(properties.effective_includes()) {
        IdSelection::All => known_ids.clone(),
        IdSelection::Ids(ids) => ids.intersection(known_ids).cloned().collect(),
    };

    included
        .into_iter()
        .filter(|id| !excludes.contains(id))
        .collect()
}

/// Registrars selected by `properties`, ordered by id
pub fn resolve_effective_registrars(
    properties: &PluginProperties,
    universe: &dyn PluginUniverse,
) -> Vec<Arc<dyn Registrar>> {
    effective_ids(properties, &universe.known_ids())
        .iter()
        .filter_map(|id| universe.resolve(id))
        .collect()
}
