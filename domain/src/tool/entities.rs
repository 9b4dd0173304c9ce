//! Tool domain entities

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Parameters passed to a tool invocation.
///
/// Ordered by key so that argument encoding is reproducible.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

/// How a tool is invoked.
///
/// The set is closed on purpose: dispatch in the executor is an exhaustive
/// `match` over these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationMode {
    /// Spawn the entry point as a subprocess (`--name value` arguments, JSON on stdout)
    #[default]
    Process,
    /// Call an in-process implementation registered under the entry point symbol
    Library,
    /// POST the parameters as JSON to the entry point URL
    #[serde(rename = "remote", alias = "remote_api", alias = "remoteapi", alias = "http")]
    RemoteApi,
}

impl InvocationMode {
    pub fn as_str(&self) -> &str {
        match self {
            InvocationMode::Process => "process",
            InvocationMode::Library => "library",
            InvocationMode::RemoteApi => "remote",
        }
    }
}

impl std::fmt::Display for InvocationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InvocationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "process" | "cli" | "script" => Ok(InvocationMode::Process),
            "library" | "lib" => Ok(InvocationMode::Library),
            "remote" | "remote_api" | "remoteapi" | "http" => Ok(InvocationMode::RemoteApi),
            other => Err(format!(
                "Unknown invocation mode: {}. Valid: process, library, remote",
                other
            )),
        }
    }
}

/// A parameter declared by a tool descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredParameter {
    /// Parameter name (becomes `--name` for process tools)
    pub name: String,
    /// Type hint (e.g., "string", "integer", "path")
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    /// Whether the parameter must be present
    #[serde(default)]
    pub required: bool,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

fn default_param_type() -> String {
    "string".to_string()
}

impl DeclaredParameter {
    pub fn new(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            param_type: default_param_type(),
            required,
            description: String::new(),
        }
    }

    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Identity and dispatch metadata for one tool.
///
/// Descriptors are immutable once built. A registry re-scan replaces a
/// descriptor wholesale when its `source_hash` changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name within a catalog
    pub name: String,
    /// Free-text grouping (e.g., "literature", "genomics")
    pub category: String,
    pub invocation_mode: InvocationMode,
    /// Description plus documentation body, used for keyword matching
    pub capabilities_text: String,
    pub keywords: BTreeSet<String>,
    /// Path, symbol or URL depending on `invocation_mode`
    pub entry_point: String,
    pub declared_parameters: Vec<DeclaredParameter>,
    /// SHA-256 of the descriptor file contents (hex)
    pub source_hash: String,
    /// Descriptor file this tool was parsed from
    pub source_path: PathBuf,
}

impl ToolDescriptor {
    /// Create a descriptor with an empty source.
    ///
    /// Mostly useful for tools constructed in code and for tests; descriptors
    /// discovered on disk are built by the registry parser.
    pub fn new(
        name: impl Into<String>,
        invocation_mode: InvocationMode,
        entry_point: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: String::new(),
            invocation_mode,
            capabilities_text: String::new(),
            keywords: BTreeSet::new(),
            entry_point: entry_point.into(),
            declared_parameters: Vec::new(),
            source_hash: String::new(),
            source_path: PathBuf::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_capabilities(mut self, text: impl Into<String>) -> Self {
        self.capabilities_text = text.into();
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.insert(keyword.into());
        self
    }

    pub fn with_parameter(mut self, param: DeclaredParameter) -> Self {
        self.declared_parameters.push(param);
        self
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>, hash: impl Into<String>) -> Self {
        self.source_path = path.into();
        self.source_hash = hash.into();
        self
    }

    /// First line of the capabilities text, for compact listings.
    pub fn summary(&self) -> &str {
        self.capabilities_text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
    }

    /// Directory containing the descriptor file, if known.
    pub fn base_dir(&self) -> Option<&Path> {
        self.source_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn parameter(&self, name: &str) -> Option<&DeclaredParameter> {
        self.declared_parameters.iter().find(|p| p.name == name)
    }

    /// Names of required parameters missing from `params`.
    pub fn missing_required<'a>(&'a self, params: &Parameters) -> Vec<&'a str> {
        self.declared_parameters
            .iter()
            .filter(|p| p.required && params.get(&p.name).is_none_or(|v| v.is_null()))
            .map(|p| p.name.as_str())
            .collect()
    }
}

impl AsRef<ToolDescriptor> for ToolDescriptor {
    fn as_ref(&self) -> &ToolDescriptor {
        self
    }
}
