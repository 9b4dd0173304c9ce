//! Descriptor file parser
//!
//! A descriptor is a text file with a YAML front-matter header followed by
//! free-text documentation:
//!
//! ```text
//! ---
//! name: pubmed-search
//! description: Search PubMed for articles matching a query
//! category: literature
//! keywords: [pubmed, articles, citations]
//! invocation: process            # process | library | remote
//! entry_point: ./search.py       # path, symbol or URL
//! parameters:
//!   - name: query
//!     required: true
//!   - name: limit
//!     type: integer
//! ---
//! # PubMed search
//!
//! Longer documentation, also used for keyword matching.
//! ```
//!
//! A process-mode descriptor may omit `entry_point`. The first existing file
//! among `run`, `run.*`, `scripts/<name>` and `scripts/<name>.*` next to the
//! descriptor is used instead.

use sciquorum_domain::{DeclaredParameter, InvocationMode, ToolDescriptor};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FRONT_MATTER_FENCE: &str = "---";

/// Why a descriptor file could not become a [`ToolDescriptor`]
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptorError {
    #[error("missing front-matter header")]
    MissingFrontMatter,

    #[error("unterminated front-matter header")]
    UnterminatedFrontMatter,

    #[error("malformed front-matter: {0}")]
    Malformed(String),

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("unknown invocation mode: {0}")]
    InvalidMode(String),

    #[error("could not read file: {0}")]
    Unreadable(String),
}

/// Keywords may be written as a YAML list or a comma-separated string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KeywordList {
    List(Vec<String>),
    Text(String),
}

impl KeywordList {
    fn into_set(self) -> BTreeSet<String> {
        let items = match self {
            KeywordList::List(items) => items,
            KeywordList::Text(text) => text.split(',').map(str::to_string).collect(),
        };
        items
            .into_iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct FrontMatter {
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: String,
    keywords: Option<KeywordList>,
    #[serde(alias = "mode", alias = "invocation_mode")]
    invocation: Option<String>,
    #[serde(alias = "entry", alias = "command", alias = "url", alias = "symbol")]
    entry_point: Option<String>,
    #[serde(default)]
    parameters: Vec<DeclaredParameter>,
}

/// SHA-256 of `content`, hex encoded
pub fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Read and parse one descriptor file.
pub fn parse_descriptor_file(path: &Path) -> Result<ToolDescriptor, DescriptorError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| DescriptorError::Unreadable(e.to_string()))?;
    parse_descriptor(&content, path)
}

/// Parse descriptor text. `path` is recorded as the descriptor's source and
/// anchors relative entry points.
pub fn parse_descriptor(content: &str, path: &Path) -> Result<ToolDescriptor, DescriptorError> {
    let (header, body) = split_front_matter(content)?;

    let front: FrontMatter =
        serde_yaml::from_str(header).map_err(|e| DescriptorError::Malformed(e.to_string()))?;

    let name = front
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| DescriptorError::MissingField("name".to_string()))?;

    let mode = match front.invocation.as_deref().map(str::trim) {
        None | Some("") => InvocationMode::default(),
        Some(raw) => raw
            .parse::<InvocationMode>()
            .map_err(|_| DescriptorError::InvalidMode(raw.to_string()))?,
    };

    let declared = front
        .entry_point
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    let entry_point = match declared {
        Some(entry) => entry,
        None if mode == InvocationMode::Process => derive_entry_point(path, &name)
            .ok_or_else(|| DescriptorError::MissingField("entry_point".to_string()))?,
        None => return Err(DescriptorError::MissingField("entry_point".to_string())),
    };

    let description = front.description.trim();
    let body = body.trim();
    let capabilities = match (description.is_empty(), body.is_empty()) {
        (false, false) => format!("{}\n\n{}", description, body),
        (false, true) => description.to_string(),
        (true, _) => body.to_string(),
    };

    let mut descriptor = ToolDescriptor::new(name, mode, entry_point)
        .with_category(front.category.trim())
        .with_capabilities(capabilities)
        .with_source(
            PathBuf::from(path),
            content_hash(content.as_bytes()),
        );
    if let Some(keywords) = front.keywords {
        for keyword in keywords.into_set() {
            descriptor = descriptor.with_keyword(keyword);
        }
    }
    for param in front.parameters {
        descriptor = descriptor.with_parameter(param);
    }
    Ok(descriptor)
}

/// Conventional executable beside the descriptor file, as `./<relative path>`
fn derive_entry_point(path: &Path, name: &str) -> Option<String> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut candidates = vec!["run".to_string(), "run.*".to_string()];
    if !name.contains(['/', '\\']) && !name.starts_with('.') {
        let name = glob::Pattern::escape(name);
        candidates.push(format!("scripts/{}", name));
        candidates.push(format!("scripts/{}.*", name));
    }

    let base = glob::Pattern::escape(&dir.to_string_lossy());
    for candidate in candidates {
        let Ok(paths) = glob::glob(&format!("{}/{}", base, candidate)) else {
            continue;
        };
        let mut found: Vec<PathBuf> = paths
            .filter_map(Result::ok)
            .filter(|p| p.is_file() && p.as_path() != path)
            .collect();
        found.sort();
        if let Some(hit) = found.first() {
            let relative = hit.strip_prefix(dir).unwrap_or(hit);
            return Some(format!("./{}", relative.to_string_lossy()));
        }
    }
    None
}

/// Split `---`-fenced front matter from the body.
fn split_front_matter(content: &str) -> Result<(&str, &str), DescriptorError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');

    let first = lines.next().ok_or(DescriptorError::MissingFrontMatter)?;
    if first.trim_end() != FRONT_MATTER_FENCE {
        return Err(DescriptorError::MissingFrontMatter);
    }

    let header_start = first.len();
    let mut offset = header_start;
    for line in lines {
        if line.trim_end() == FRONT_MATTER_FENCE {
            let header = &content[header_start..offset];
            let body = &content[offset + line.len()..];
            return Ok((header, body));
        }
        offset += line.len();
    }
    Err(DescriptorError::UnterminatedFrontMatter)
}
