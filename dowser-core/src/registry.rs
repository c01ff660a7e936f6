use crate::{Adapter, AdapterConfig, Provider};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Owner of the process's adapters: one per distinct provider and
/// connection-string pair, created on first request and shared afterwards.
///
/// The registry is an explicit object; nothing here is ambient global state.
#[derive(Default)]
pub struct Registry {
    adapters: Mutex<HashMap<(String, String), Arc<Adapter>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the adapter for `provider` + `connection_string`, creating it
    /// with default settings on first use. Provider names compare
    /// case-insensitively.
    pub fn adapter(
        &self,
        provider: Arc<dyn Provider>,
        connection_string: &str,
    ) -> Arc<Adapter> {
        self.adapter_with(provider, connection_string, AdapterConfig::default())
    }

    pub fn adapter_with(
        &self,
        provider: Arc<dyn Provider>,
        connection_string: &str,
        config: AdapterConfig,
    ) -> Arc<Adapter> {
        let key = (
            provider.name().to_lowercase(),
            connection_string.to_string(),
        );
        self.adapters
            .lock()
            .unwrap()
            .entry(key)
            .or_insert_with(|| {
                Arc::new(Adapter::with_config(provider, connection_string, config))
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.adapters.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.lock().unwrap().is_empty()
    }
}
