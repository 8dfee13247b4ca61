//! Extractor dispatch: extension-keyed for source files, name-keyed for
//! dependency manifests.

use std::collections::HashMap;
use std::sync::Arc;

use crate::csharp::CSharpExtractor;
use crate::extractor::Extractor;
use crate::go::GoExtractor;
use crate::java::JavaExtractor;
use crate::manifest::ManifestExtractor;
use crate::python::PythonExtractor;
use crate::rust_lang::RustExtractor;
use crate::strings::basename;
use crate::typescript::{JavaScriptExtractor, TypeScriptExtractor};

pub struct Registry {
    by_extension: HashMap<String, Arc<dyn Extractor>>,
    by_filename: HashMap<String, Arc<dyn Extractor>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            by_extension: HashMap::new(),
            by_filename: HashMap::new(),
        }
    }

    /// All built-in extractors: six languages plus the manifest handler.
    pub fn with_defaults() -> Self {
        let mut registry = Registry::new();
        registry.register(Arc::new(GoExtractor));
        registry.register(Arc::new(PythonExtractor));
        registry.register(Arc::new(TypeScriptExtractor));
        registry.register(Arc::new(JavaScriptExtractor));
        registry.register(Arc::new(JavaExtractor));
        registry.register(Arc::new(RustExtractor));
        registry.register(Arc::new(CSharpExtractor));

        let manifest = Arc::new(ManifestExtractor);
        for name in ManifestExtractor::FILENAMES {
            registry.register_filename(name, manifest.clone());
        }
        registry
    }

    pub fn register(&mut self, extractor: Arc<dyn Extractor>) {
        for ext in extractor.extensions() {
            self.by_extension.insert(ext.to_string(), extractor.clone());
        }
    }

    pub fn register_filename(&mut self, filename: &str, extractor: Arc<dyn Extractor>) {
        self.by_filename.insert(filename.to_string(), extractor);
    }

    /// Resolve the extractor for a repo-relative path. File names win
    /// over extensions so `package.json` never routes by `.json`.
    pub fn for_path(&self, path: &str) -> Option<Arc<dyn Extractor>> {
        let base = basename(path);
        if let Some(extractor) = self.by_filename.get(base) {
            return Some(extractor.clone());
        }
        let ext = base.rsplit('.').next()?;
        if ext == base {
            return None;
        }
        self.by_extension.get(ext).cloned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
