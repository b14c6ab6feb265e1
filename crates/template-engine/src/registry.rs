//! Template registry and metadata
//!
//! The registry is built once at service startup and shared behind an
//! `Arc`. `reload()` re-reads its source and swaps the whole set in one
//! step; if any template fails validation the previous set stays live.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use jobpack_types::{DocType, DocumentTemplate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::embedded::embedded_sources;
use crate::error::TemplateError;
use crate::validator::validate_template;

type TemplateSet = BTreeMap<DocType, Arc<DocumentTemplate>>;

/// Where template definitions are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Compiled-in templates
    Embedded,
    /// Every `*.json` file in a directory
    Directory(PathBuf),
}

/// Information about an available template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    pub doc_type: DocType,
    pub title: String,
    pub schema_version: String,
    pub jurisdiction: String,
    pub section_ids: Vec<String>,
    /// `section.field` ids marked required
    pub required_field_ids: Vec<String>,
}

impl From<&DocumentTemplate> for TemplateInfo {
    fn from(template: &DocumentTemplate) -> Self {
        Self {
            doc_type: template.doc_type,
            title: template.title.clone(),
            schema_version: template.schema_version.clone(),
            jurisdiction: template.jurisdiction.clone(),
            section_ids: template.sections.iter().map(|s| s.id.clone()).collect(),
            required_field_ids: template
                .sections
                .iter()
                .flat_map(|s| {
                    s.fields()
                        .iter()
                        .filter(|f| f.required)
                        .map(move |f| format!("{}.{}", s.id, f.id))
                })
                .collect(),
        }
    }
}

/// Process-wide, validated template set
#[derive(Debug)]
pub struct TemplateRegistry {
    source: TemplateSource,
    templates: RwLock<Arc<TemplateSet>>,
}

impl TemplateRegistry {
    /// Load and validate every template from `source`
    pub fn load(source: TemplateSource) -> Result<Self, TemplateError> {
        let templates = load_set(&source)?;
        info!(source = ?source, count = templates.len(), "Loaded document templates");
        Ok(Self {
            source,
            templates: RwLock::new(Arc::new(templates)),
        })
    }

    /// Registry over the compiled-in templates
    pub fn embedded() -> Result<Self, TemplateError> {
        Self::load(TemplateSource::Embedded)
    }

    pub fn from_dir(path: impl Into<PathBuf>) -> Result<Self, TemplateError> {
        Self::load(TemplateSource::Directory(path.into()))
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    fn snapshot(&self) -> Arc<TemplateSet> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Template for `doc_type`
    pub fn get(&self, doc_type: DocType) -> Result<Arc<DocumentTemplate>, TemplateError> {
        self.snapshot()
            .get(&doc_type)
            .cloned()
            .ok_or(TemplateError::NotFound(doc_type))
    }

    /// Metadata for every loaded template, in `DocType` order
    pub fn list(&self) -> Vec<TemplateInfo> {
        self.snapshot()
            .values()
            .map(|t| TemplateInfo::from(t.as_ref()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Re-read the source and replace the live set. Returns the number of
    /// templates now loaded.
    pub fn reload(&self) -> Result<usize, TemplateError> {
        let fresh = match load_set(&self.source) {
            Ok(set) => set,
            Err(e) => {
                warn!(error = %e, "Template reload failed, keeping current set");
                return Err(e);
            }
        };
        let count = fresh.len();
        *self
            .templates
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(fresh);
        info!(count, "Reloaded document templates");
        Ok(count)
    }
}

fn load_set(source: &TemplateSource) -> Result<TemplateSet, TemplateError> {
    let sources: Vec<(String, String)> = match source {
        TemplateSource::Embedded => embedded_sources()
            .into_iter()
            .map(|(name, raw)| (name, raw.to_string()))
            .collect(),
        TemplateSource::Directory(dir) => read_dir_sources(dir)?,
    };

    let mut set = TemplateSet::new();
    for (name, raw) in sources {
        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|error| TemplateError::Json {
                source_name: name.clone(),
                error,
            })?;
        let template = validate_template(&value).map_err(|error| TemplateError::Invalid {
            source_name: name.clone(),
            error,
        })?;
        let doc_type = template.doc_type;
        if set.insert(doc_type, Arc::new(template)).is_some() {
            return Err(TemplateError::Duplicate(doc_type));
        }
    }
    Ok(set)
}

fn read_dir_sources(dir: &Path) -> Result<Vec<(String, String)>, TemplateError> {
    let io_err = |error| TemplateError::Io {
        path: dir.to_path_buf(),
        error,
    };

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(io_err)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let raw = std::fs::read_to_string(&path).map_err(|error| TemplateError::Io {
                path: path.clone(),
                error,
            })?;
            Ok::<_, TemplateError>((path.display().to_string(), raw))
        })
        .collect()
}
