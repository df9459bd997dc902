//! Graph sources: one-shot bulk loads of an ontology by identifier.
//!
//! The production data source (a relational concept/relation store) lives
//! outside this workspace. These sources cover files and tests.

use crate::{GraphError, OntologyGraph, OntologySpec};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub trait GraphSource {
    /// Load the raw record for `ontology`.
    fn load(&self, ontology: &str) -> Result<OntologySpec, GraphError>;

    /// Load and validate the graph for `ontology`.
    fn load_graph(&self, ontology: &str) -> Result<OntologyGraph, GraphError> {
        OntologyGraph::from_spec(self.load(ontology)?)
    }
}

/// Read an [`OntologySpec`] from a JSON file.
pub fn load_json_file(path: &Path) -> Result<OntologySpec, GraphError> {
    let text = fs::read_to_string(path)?;
    let spec: OntologySpec = serde_json::from_str(&text)?;
    tracing::debug!(path = %path.display(), ontology = %spec.name, "loaded ontology spec");
    Ok(spec)
}

/// Directory of `<ontology>.json` files.
#[derive(Debug, Clone)]
pub struct JsonGraphSource {
    dir: PathBuf,
}

impl JsonGraphSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ontology: &str) -> PathBuf {
        self.dir.join(format!("{ontology}.json"))
    }
}

impl GraphSource for JsonGraphSource {
    fn load(&self, ontology: &str) -> Result<OntologySpec, GraphError> {
        let path = self.path_for(ontology);
        if !path.is_file() {
            return Err(GraphError::Source {
                ontology: ontology.to_string(),
                message: format!("no such file: {}", path.display()),
            });
        }
        load_json_file(&path)
    }
}

/// Graph source backed by a map of records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraphSource {
    specs: HashMap<String, OntologySpec>,
}

impl InMemoryGraphSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ontology: impl Into<String>, spec: OntologySpec) {
        self.specs.insert(ontology.into(), spec);
    }

    pub fn with(mut self, ontology: impl Into<String>, spec: OntologySpec) -> Self {
        self.insert(ontology, spec);
        self
    }
}

impl GraphSource for InMemoryGraphSource {
    fn load(&self, ontology: &str) -> Result<OntologySpec, GraphError> {
        self.specs
            .get(ontology)
            .cloned()
            .ok_or_else(|| GraphError::Source {
                ontology: ontology.to_string(),
                message: "unknown ontology".to_string(),
            })
    }
}
