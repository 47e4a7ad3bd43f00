use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::check::Shape;

/// A module's published surface: the object shape of everything it
/// exposes (bindings, functions, args, envs) plus the names of args a
/// dependent must supply.
#[derive(Debug, Clone)]
pub struct ModuleExports {
    pub shape: Shape,
    pub required_args: Vec<String>,
}

/// Process-wide mapping from dotted module path to last-published export
/// shape. Passed explicitly into checks and compiles — no singleton.
/// Clones share state, so one registry can serve many compiles under a
/// single-writer-many-reader discipline.
#[derive(Clone, Default)]
pub struct ExportRegistry {
    inner: Arc<RwLock<HashMap<String, ModuleExports>>>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish atomically; later reads in any clone see the entry.
    pub fn register(&self, path: &str, exports: ModuleExports) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(path.to_string(), exports);
    }

    pub fn exports_of(&self, path: &str) -> Option<ModuleExports> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(path).cloned()
    }

    pub fn shape_of(&self, path: &str) -> Option<Shape> {
        self.exports_of(path).map(|exports| exports.shape)
    }

    /// Administrative reset used by test suites.
    pub fn clear(&self) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.clear();
    }

    pub fn len(&self) -> usize {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
