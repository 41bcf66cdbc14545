//! Chart value overrides derived from a load balancer snapshot.

use std::collections::BTreeMap;

use crate::config::ChartConfig;
use crate::model::{LoadBalancerRef, ValueOverride};

/// Builds the value overrides for a create call.
///
/// Key uniqueness across cpu/memory/id keys is enforced by config validation;
/// if a key still repeats the last assignment wins.
#[derive(Debug, Clone, Default)]
pub struct OverrideBuilder {
    cpu_keys: Vec<String>,
    memory_keys: Vec<String>,
    id_key: Option<String>,
}

impl OverrideBuilder {
    pub fn from_config(config: &ChartConfig) -> Self {
        Self {
            cpu_keys: config.cpu_keys.clone(),
            memory_keys: config.memory_keys.clone(),
            id_key: config.id_key.clone(),
        }
    }

    pub fn build(&self, lb: &LoadBalancerRef) -> Vec<ValueOverride> {
        let mut values = BTreeMap::new();

        if let Some(key) = &self.id_key {
            values.insert(key.clone(), lb.id().to_string());
        }

        if let Some(snapshot) = lb.snapshot() {
            let sizing = [
                (&self.cpu_keys, &snapshot.resources.cpu),
                (&self.memory_keys, &snapshot.resources.memory),
            ];
            for (keys, value) in sizing {
                if value.is_empty() {
                    continue;
                }
                for key in keys {
                    values.insert(key.clone(), value.clone());
                }
            }
        }

        values
            .into_iter()
            .map(|(key, value)| ValueOverride { key, value })
            .collect()
    }
}
