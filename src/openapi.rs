//! OpenAPI tools: load a spec from disk, inline its `$ref`s, and turn it into
//! a [`ToolDefinition`] the service can call.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::agents::{OpenApiAuth, OpenApiFunctionDefinition, ToolDefinition};

#[derive(Debug, Error)]
pub enum ToolSpecError {
    #[error("failed to read OpenAPI spec {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse OpenAPI spec {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{} has no `openapi` or `swagger` version field", path.display())]
    NotOpenApi { path: PathBuf },
    #[error("reference `{reference}` in {} points at nothing", path.display())]
    UnresolvedReference { reference: String, path: PathBuf },
    #[error("reference `{reference}` in {} refers back to itself", path.display())]
    CyclicReference { reference: String, path: PathBuf },
    #[error("reference `{0}` is remote; only local files can be referenced")]
    UnsupportedReference(String),
}

/// An OpenAPI document exposed to an agent under a tool name.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenApiTool {
    pub name: String,
    pub description: String,
    pub spec: Value,
    pub auth: OpenApiAuth,
}

impl OpenApiTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        spec: Value,
        auth: OpenApiAuth,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            spec,
            auth,
        }
    }

    /// Reads the spec at `path` with every `$ref` inlined.
    pub fn from_file(
        name: impl Into<String>,
        description: impl Into<String>,
        path: impl AsRef<Path>,
        auth: OpenApiAuth,
    ) -> Result<Self, ToolSpecError> {
        let spec = load_spec(path)?;
        Ok(Self::new(name, description, spec, auth))
    }

    /// The tool definitions to attach to an agent. Combine tools by concatenating these.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition::Openapi(OpenApiFunctionDefinition {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            spec: self.spec.clone(),
            auth: self.auth.clone(),
        })]
    }
}

/// Reads an OpenAPI JSON document and resolves its internal and file-relative references.
pub fn load_spec(path: impl AsRef<Path>) -> Result<Value, ToolSpecError> {
    let path = canonical(path.as_ref())?;
    let mut resolver = RefResolver::default();
    let document = resolver.document(&path)?;

    if document.get("openapi").is_none() && document.get("swagger").is_none() {
        return Err(ToolSpecError::NotOpenApi { path });
    }

    resolver.resolve(&document, &path, &mut Vec::new())
}

/// Absolute path with `..` and symlinks removed, so one file always gets one key.
fn canonical(path: &Path) -> Result<PathBuf, ToolSpecError> {
    fs::canonicalize(path).map_err(|source| ToolSpecError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default)]
struct RefResolver {
    /// Parsed files, keyed by canonical path.
    documents: HashMap<PathBuf, Value>,
    /// Fully expanded reference targets, keyed by `<canonical path>#<pointer>`.
    resolved: HashMap<String, Value>,
}

impl RefResolver {
    fn document(&mut self, path: &Path) -> Result<Value, ToolSpecError> {
        if let Some(document) = self.documents.get(path) {
            return Ok(document.clone());
        }

        log::debug!("Loading OpenAPI document {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| ToolSpecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: Value =
            serde_json::from_str(&text).map_err(|source| ToolSpecError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        self.documents.insert(path.to_path_buf(), document.clone());
        Ok(document)
    }

    /// `stack` holds the references currently being expanded, to catch cycles.
    fn resolve(
        &mut self,
        value: &Value,
        file: &Path,
        stack: &mut Vec<String>,
    ) -> Result<Value, ToolSpecError> {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    return self.follow(reference, file, stack);
                }

                let mut resolved = Map::with_capacity(map.len());
                for (key, value) in map {
                    resolved.insert(key.clone(), self.resolve(value, file, stack)?);
                }
                Ok(Value::Object(resolved))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve(item, file, stack))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn follow(
        &mut self,
        reference: &str,
        file: &Path,
        stack: &mut Vec<String>,
    ) -> Result<Value, ToolSpecError> {
        if reference.contains("://") {
            return Err(ToolSpecError::UnsupportedReference(reference.to_string()));
        }

        let (target, pointer) = reference.split_once('#').unwrap_or((reference, ""));
        let target_file = if target.is_empty() {
            file.to_path_buf()
        } else {
            canonical(&file.parent().unwrap_or_else(|| Path::new("")).join(target))?
        };

        let key = format!("{}#{pointer}", target_file.display());
        if let Some(resolved) = self.resolved.get(&key) {
            return Ok(resolved.clone());
        }
        if stack.contains(&key) {
            return Err(ToolSpecError::CyclicReference {
                reference: reference.to_string(),
                path: file.to_path_buf(),
            });
        }

        let document = self.document(&target_file)?;
        let target = document
            .pointer(pointer)
            .ok_or_else(|| ToolSpecError::UnresolvedReference {
                reference: reference.to_string(),
                path: file.to_path_buf(),
            })?;

        stack.push(key.clone());
        let resolved = self.resolve(target, &target_file, stack);
        stack.pop();

        let resolved = resolved?;
        self.resolved.insert(key, resolved.clone());
        Ok(resolved)
    }
}
