use std::sync::Arc;

use crate::config::EngineConfig;
use crate::graph::ResourceGraph;
use crate::registry::BuiltinRegistry;

/// Everything an executor shares with its siblings: the builtin registry,
/// the resource graph and the engine configuration. Cloning is cheap.
#[derive(Clone)]
pub struct Runtime {
    pub registry: Arc<BuiltinRegistry>,
    pub graph: Arc<dyn ResourceGraph>,
    pub config: Arc<EngineConfig>,
}

impl Runtime {
    pub fn new(graph: Arc<dyn ResourceGraph>) -> Self {
        Self {
            registry: Arc::new(BuiltinRegistry::new()),
            graph,
            config: Arc::new(EngineConfig::default()),
        }
    }

    /// Shares an already built registry instead of building a new one.
    pub fn with_registry(mut self, registry: Arc<BuiltinRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Arc::new(config);
        self
    }
}
