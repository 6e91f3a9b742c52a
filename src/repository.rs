use crate::applicability::{ApplicabilityResolver, ApplicabilityRule};
use crate::config::{Config, NodeConfig};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const PROP_APPLIES_TO: &str = "appliesTo";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentNode {
    pub path: String,
    pub properties: Map<String, Value>,
}

impl ContentNode {
    /// Reads a multi-valued string property. A single string is read as a
    /// one-element list; any other value type counts as absent.
    pub fn string_array(&self, name: &str) -> Option<Vec<String>> {
        match self.properties.get(name)? {
            Value::String(s) => Some(vec![s.clone()]),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => None,
        }
    }
}

/// Read-only snapshot of the content nodes workflow models live in.
#[derive(Debug, Clone, Default)]
pub struct ContentRepository {
    nodes: HashMap<String, ContentNode>,
}

impl ContentRepository {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut nodes = HashMap::with_capacity(config.nodes.len());
        for NodeConfig { path, properties } in &config.nodes {
            let path = normalize(path);
            if !path.starts_with('/') {
                anyhow::bail!("Node path must be absolute: {}", path);
            }
            let node = ContentNode {
                path: path.to_string(),
                properties: properties.clone(),
            };
            if nodes.insert(path.to_string(), node).is_some() {
                anyhow::bail!("Duplicate node path in config: {}", path);
            }
        }
        Ok(Self { nodes })
    }

    pub fn get(&self, path: &str) -> Option<&ContentNode> {
        self.nodes.get(normalize(path))
    }

    pub fn parent(&self, node: &ContentNode) -> Option<&ContentNode> {
        parent_path(&node.path).and_then(|p| self.get(p))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ContentNode> {
        self.nodes.values()
    }

    /// Rule for a model whose `wid` is `node`: the `appliesTo` of the
    /// parent node, or no restriction when the parent or property is absent.
    fn rule_for(&self, node: &ContentNode) -> ApplicabilityRule {
        match self
            .parent(node)
            .and_then(|parent| parent.string_array(PROP_APPLIES_TO))
        {
            Some(patterns) => ApplicabilityRule::new(patterns),
            None => ApplicabilityRule::universal(),
        }
    }
}

/// Resolves a `wid` (the `jcr:content/model` node of a workflow model) to
/// the `appliesTo` property of its parent `jcr:content` node.
///
/// Rules are built and their patterns compiled once per snapshot; lookups
/// only read them.
#[derive(Debug, Clone, Default)]
pub struct RepositoryResolver {
    repository: Arc<ContentRepository>,
    rules: HashMap<String, ApplicabilityRule>,
}

impl RepositoryResolver {
    pub fn new(repository: Arc<ContentRepository>) -> Self {
        let rules: HashMap<String, ApplicabilityRule> = repository
            .nodes()
            .map(|node| (node.path.clone(), repository.rule_for(node)))
            .collect();
        debug!("Built applicability rules for {} nodes", rules.len());
        Self { repository, rules }
    }

    pub fn repository(&self) -> &ContentRepository {
        &self.repository
    }
}

impl ApplicabilityResolver for RepositoryResolver {
    fn lookup(&self, model_id: &str) -> Option<ApplicabilityRule> {
        self.rules.get(normalize(model_id)).cloned()
    }
}

fn normalize(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

fn parent_path(path: &str) -> Option<&str> {
    let idx = path.rfind('/')?;
    match idx {
        0 if path.len() > 1 => Some("/"),
        0 => None,
        _ => Some(&path[..idx]),
    }
}
