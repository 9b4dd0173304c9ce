//! Tool catalog: an immutable, ordered set of descriptors.
//!
//! A [`Catalog`] is built once per registry scan and then only read. The
//! registry swaps whole catalogs behind an `Arc`, so readers holding an old
//! catalog keep a consistent view while a refresh builds the next one.

use super::entities::{InvocationMode, ToolDescriptor};
use crate::selection::ranking::rank_by_keyword_overlap;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Optional narrowing applied on top of the text query in [`Catalog::search`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Case-insensitive exact category match
    pub category: Option<String>,
    pub invocation_mode: Option<InvocationMode>,
    /// Case-insensitive exact keyword match
    pub keyword: Option<String>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_mode(mut self, mode: InvocationMode) -> Self {
        self.invocation_mode = Some(mode);
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    fn matches(&self, tool: &ToolDescriptor) -> bool {
        if let Some(category) = &self.category
            && !tool.category.eq_ignore_ascii_case(category)
        {
            return false;
        }
        if let Some(mode) = self.invocation_mode
            && tool.invocation_mode != mode
        {
            return false;
        }
        if let Some(keyword) = &self.keyword
            && !tool.keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword))
        {
            return false;
        }
        true
    }
}

/// Statistics about a catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub total_tools: usize,
    pub tools_per_category: BTreeMap<String, usize>,
    pub tools_per_mode: BTreeMap<String, usize>,
}

/// Ordered collection of tool descriptors with unique names.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tools: Vec<Arc<ToolDescriptor>>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from descriptors in insertion order.
    ///
    /// Later descriptors with an already-seen name are returned in the second
    /// element instead of being inserted.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = Arc<ToolDescriptor>>,
    ) -> (Self, Vec<Arc<ToolDescriptor>>) {
        let mut catalog = Self::new();
        let mut rejected = Vec::new();
        for descriptor in descriptors {
            if let Err(dup) = catalog.insert(descriptor) {
                rejected.push(dup);
            }
        }
        (catalog, rejected)
    }

    /// Insert a descriptor, rejecting duplicate names.
    pub fn insert(&mut self, descriptor: Arc<ToolDescriptor>) -> Result<(), Arc<ToolDescriptor>> {
        if self.index.contains_key(&descriptor.name) {
            return Err(descriptor);
        }
        self.index
            .insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ToolDescriptor>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All descriptors in insertion order.
    pub fn all(&self) -> &[Arc<ToolDescriptor>] {
        &self.tools
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    /// Case-insensitive substring search over name, category, keywords and
    /// capabilities text.
    ///
    /// Every whitespace-separated term of `query` must occur somewhere in the
    /// tool's searchable text. An empty query matches every tool, so
    /// `search("", &SearchFilter::default())` returns the whole catalog.
    pub fn search(&self, query: &str, filter: &SearchFilter) -> Vec<Arc<ToolDescriptor>> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        self.tools
            .iter()
            .filter(|t| filter.matches(t))
            .filter(|t| {
                if terms.is_empty() {
                    return true;
                }
                let haystack = searchable_text(t);
                terms.iter().all(|term| haystack.contains(term.as_str()))
            })
            .cloned()
            .collect()
    }

    /// Rank tools by keyword overlap with `topic` and return the best `limit`.
    ///
    /// Tools sharing no significant word with the topic are never suggested.
    pub fn suggest(&self, topic: &str, limit: usize) -> Vec<Arc<ToolDescriptor>> {
        rank_by_keyword_overlap(topic, &self.tools)
            .into_iter()
            .filter(|(_, score)| *score > 0)
            .take(limit)
            .map(|(i, _)| Arc::clone(&self.tools[i]))
            .collect()
    }

    pub fn stats(&self) -> CatalogStats {
        let mut stats = CatalogStats {
            total_tools: self.tools.len(),
            ..Default::default()
        };
        for tool in &self.tools {
            let category = if tool.category.is_empty() {
                "uncategorized".to_string()
            } else {
                tool.category.clone()
            };
            *stats.tools_per_category.entry(category).or_insert(0) += 1;
            *stats
                .tools_per_mode
                .entry(tool.invocation_mode.to_string())
                .or_insert(0) += 1;
        }
        stats
    }
}

fn searchable_text(tool: &ToolDescriptor) -> String {
    let mut text = String::with_capacity(tool.capabilities_text.len() + 64);
    text.push_str(&tool.name);
    text.push('\n');
    text.push_str(&tool.category);
    text.push('\n');
    for keyword in &tool.keywords {
        text.push_str(keyword);
        text.push('\n');
    }
    text.push_str(&tool.capabilities_text);
    text.to_lowercase()
}
