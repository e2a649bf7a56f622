use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// One level of an expectation file: either a status or a named group.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Node {
    Leaf(String),
    Group(IndexMap<String, Node>),
}

/// Expected statuses keyed by suite (or file) names, e.g.
/// `{"Suite A": {"test 1": "pass", "test 2": "fail"}}`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ExpectationTree {
    root: IndexMap<String, Node>,
}

impl ExpectationTree {
    pub fn new(root: IndexMap<String, Node>) -> Self {
        Self { root }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read expectations {}", path.display()))?;
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml")
        );
        let parsed = if is_yaml {
            Self::from_yaml_str(&raw)
        } else {
            Self::from_json_str(&raw)
        };
        parsed.with_context(|| format!("parse expectations {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("expectations must be nested objects with string statuses")
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("expectations must be nested mappings with string statuses")
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Status stored at `path`. A path ending on a group, or running
    /// through a leaf, is absent.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&str> {
        lookup_in(&self.root, path)
    }

    /// True when `path` names a group rather than a status.
    pub fn ends_on_group<S: AsRef<str>>(&self, path: &[S]) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };
        let mut group = &self.root;
        for key in parents {
            match group.get(key.as_ref()) {
                Some(Node::Group(children)) => group = children,
                _ => return false,
            }
        }
        matches!(group.get(last.as_ref()), Some(Node::Group(_)))
    }

    /// Deletes the leaf at `path`, leaving now-empty groups in place.
    /// Returns the removed status, or `None` if there was no leaf there.
    pub fn remove<S: AsRef<str>>(&mut self, path: &[S]) -> Option<String> {
        remove_in(&mut self.root, path)
    }

    /// Drops every group left without leaves, bottom-up.
    pub fn prune_empty(&mut self) {
        prune_in(&mut self.root);
    }

    /// Every root-to-leaf path, depth first in file order.
    pub fn leaf_paths(&self) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        collect_in(&self.root, &mut prefix, &mut out);
        out
    }
}

fn lookup_in<'a, S: AsRef<str>>(group: &'a IndexMap<String, Node>, path: &[S]) -> Option<&'a str> {
    let (first, rest) = path.split_first()?;
    match (group.get(first.as_ref())?, rest.is_empty()) {
        (Node::Leaf(status), true) => Some(status.as_str()),
        (Node::Group(children), false) => lookup_in(children, rest),
        _ => None,
    }
}

fn remove_in<S: AsRef<str>>(group: &mut IndexMap<String, Node>, path: &[S]) -> Option<String> {
    let (first, rest) = path.split_first()?;
    let key = first.as_ref();
    if !rest.is_empty() {
        return match group.get_mut(key)? {
            Node::Group(children) => remove_in(children, rest),
            Node::Leaf(_) => None,
        };
    }
    if !matches!(group.get(key), Some(Node::Leaf(_))) {
        return None;
    }
    match group.shift_remove(key) {
        Some(Node::Leaf(status)) => Some(status),
        _ => None,
    }
}

fn prune_in(group: &mut IndexMap<String, Node>) {
    group.retain(|_, node| match node {
        Node::Leaf(_) => true,
        Node::Group(children) => {
            prune_in(children);
            !children.is_empty()
        }
    });
}

fn collect_in(group: &IndexMap<String, Node>, prefix: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
    for (name, node) in group {
        prefix.push(name.clone());
        match node {
            Node::Leaf(_) => out.push(prefix.clone()),
            Node::Group(children) => collect_in(children, prefix, out),
        }
        prefix.pop();
    }
}
