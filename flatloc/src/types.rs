//! Core, format-agnostic types for flatloc.
//!
//! The nested application tree is built from [`Node`] values; the flat
//! translation-service document is built from [`FlatNode`] values. Both
//! containers preserve authoring order, so lookups go through ordered
//! `Vec`-backed maps rather than hash maps.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// A dotted key path addressing a node in either tree shape.
///
/// Array elements are addressed by their decimal index as a segment, so one
/// path type covers the nested tree, the flat document, and the remap
/// directive syntax.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    pub fn root() -> Self {
        KeyPath(Vec::new())
    }

    pub fn from_segments(segments: Vec<String>) -> Self {
        KeyPath(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn join(&self, segment: impl Into<String>) -> KeyPath {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        KeyPath(segments)
    }

    pub fn join_index(&self, index: usize) -> KeyPath {
        self.join(index.to_string())
    }

    /// Appends all of `other`'s segments.
    pub fn concat(&self, other: &KeyPath) -> KeyPath {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        KeyPath(segments)
    }

    pub fn parent(&self) -> Option<KeyPath> {
        if self.0.is_empty() {
            None
        } else {
            Some(KeyPath(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// First segment, i.e. the top-level section this path belongs to.
    pub fn head(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// True when `self` is `other` or an ancestor of `other`.
    pub fn is_prefix_of(&self, other: &KeyPath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// True when `self` is an ancestor of `other` (equality excluded).
    pub fn is_strict_ancestor_of(&self, other: &KeyPath) -> bool {
        other.0.len() > self.0.len() && self.is_prefix_of(other)
    }
}

impl Display for KeyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for KeyPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.split('.').collect();
        let valid = !s.is_empty()
            && segments
                .iter()
                .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_'));
        if valid {
            Ok(KeyPath(segments.into_iter().map(str::to_string).collect()))
        } else {
            Err(format!("invalid dotted key path `{}`", s))
        }
    }
}

/// An ordered object: insertion-ordered `name -> Node` entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Object {
    entries: Vec<(String, Node)>,
}

impl Object {
    pub fn new() -> Self {
        Object::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, n)| n)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, n)| n)
    }

    /// Replaces the value in place when the key exists, appends otherwise.
    pub fn insert(&mut self, key: impl Into<String>, node: Node) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => *slot = node,
            None => self.entries.push((key, node)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, n)| (k.as_str(), n))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Node)> {
        self.entries.iter_mut().map(|(k, n)| (k.as_str(), n))
    }
}

impl FromIterator<(String, Node)> for Object {
    fn from_iter<T: IntoIterator<Item = (String, Node)>>(iter: T) -> Self {
        Object {
            entries: iter.into_iter().collect(),
        }
    }
}

/// One node of the nested application tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// A translatable message, singular or pluralized.
    Leaf(Message),
    /// An ordered list of nodes.
    Array(Vec<Node>),
    /// An ordered map of named children.
    Object(Object),
}

impl Node {
    pub fn as_leaf(&self) -> Option<&Message> {
        match self {
            Node::Leaf(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Node::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Resolves one path segment: object lookup by name, array lookup by
    /// decimal index.
    pub fn child(&self, segment: &str) -> Option<&Node> {
        match self {
            Node::Leaf(_) => None,
            Node::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            Node::Object(object) => object.get(segment),
        }
    }

    pub fn child_mut(&mut self, segment: &str) -> Option<&mut Node> {
        match self {
            Node::Leaf(_) => None,
            Node::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(move |i| items.get_mut(i)),
            Node::Object(object) => object.get_mut(segment),
        }
    }

    pub fn at_path(&self, path: &KeyPath) -> Option<&Node> {
        let mut current = self;
        for segment in path.segments() {
            current = current.child(segment)?;
        }
        Some(current)
    }

    pub fn at_path_mut(&mut self, path: &KeyPath) -> Option<&mut Node> {
        let mut current = self;
        for segment in path.segments() {
            current = current.child_mut(segment)?;
        }
        Some(current)
    }
}

/// One leaf of the flat translation-service document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatEntry {
    /// The message text in the flat plural encoding.
    pub text: String,

    /// Optional comment shown to translators next to the entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub comment: Option<String>,
}

/// One node of the flat document: an entry, or a subtree of named nodes.
/// The flat shape has no arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlatNode {
    Entry(FlatEntry),
    Tree(FlatTree),
}

/// An ordered `name -> FlatNode` map, the container shape of the flat
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlatTree {
    entries: Vec<(String, FlatNode)>,
}

impl FlatTree {
    pub fn new() -> Self {
        FlatTree::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&FlatNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, n)| n)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut FlatNode> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, n)| n)
    }

    pub fn insert(&mut self, key: impl Into<String>, node: FlatNode) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => *slot = node,
            None => self.entries.push((key, node)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FlatNode> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlatNode)> {
        self.entries.iter().map(|(k, n)| (k.as_str(), n))
    }

    pub fn at_path(&self, path: &KeyPath) -> Option<&FlatNode> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.get(first)?;
        for segment in rest {
            match current {
                FlatNode::Tree(tree) => current = tree.get(segment)?,
                FlatNode::Entry(_) => return None,
            }
        }
        Some(current)
    }

    /// Inserts `node` at `path`, creating intermediate subtrees as needed.
    /// Fails when the path runs through an existing entry.
    pub fn set_at_path(&mut self, path: &KeyPath, node: FlatNode) -> Result<(), String> {
        let segments = path.segments();
        if segments.is_empty() {
            return Err("cannot set the document root".to_string());
        }
        let mut tree = self;
        for segment in &segments[..segments.len() - 1] {
            if !matches!(tree.get(segment), Some(FlatNode::Tree(_))) {
                if tree.get(segment).is_some() {
                    return Err(format!("`{}` passes through a non-tree entry", path));
                }
                tree.insert(segment.clone(), FlatNode::Tree(FlatTree::new()));
            }
            tree = match tree.get_mut(segment) {
                Some(FlatNode::Tree(t)) => t,
                _ => unreachable!("just inserted a tree"),
            };
        }
        tree.insert(segments[segments.len() - 1].clone(), node);
        Ok(())
    }

    /// Removes the node at `path` and prunes any subtrees left empty by the
    /// removal.
    pub fn remove_at_path(&mut self, path: &KeyPath) -> Option<FlatNode> {
        let segments = path.segments();
        let (last, ancestors) = segments.split_last()?;
        let mut tree: &mut FlatTree = self;
        for segment in ancestors {
            tree = match tree.get_mut(segment) {
                Some(FlatNode::Tree(t)) => t,
                _ => return None,
            };
        }
        let removed = tree.remove(last)?;
        // Prune now-empty ancestors from the deepest one up.
        for depth in (1..segments.len()).rev() {
            let parent = KeyPath::from_segments(segments[..depth].to_vec());
            let empty = matches!(self.at_path(&parent), Some(FlatNode::Tree(t)) if t.is_empty());
            if empty {
                self.remove_at_path(&parent);
            } else {
                break;
            }
        }
        Some(removed)
    }

    /// Sorts this subtree's keys alphabetically, recursing into nested
    /// subtrees.
    pub fn sort_keys_recursive(&mut self) {
        self.entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (_, node) in &mut self.entries {
            if let FlatNode::Tree(tree) = node {
                tree.sort_keys_recursive();
            }
        }
    }

}

impl FromIterator<(String, FlatNode)> for FlatTree {
    fn from_iter<T: IntoIterator<Item = (String, FlatNode)>>(iter: T) -> Self {
        FlatTree {
            entries: iter.into_iter().collect(),
        }
    }
}

impl FlatNode {
    pub fn entry(text: impl Into<String>, comment: Option<String>) -> Self {
        FlatNode::Entry(FlatEntry {
            text: text.into(),
            comment,
        })
    }

    pub fn as_entry(&self) -> Option<&FlatEntry> {
        match self {
            FlatNode::Entry(entry) => Some(entry),
            _ => None,
        }
    }

    /// Structural equality that ignores translator comments, used to compare
    /// remapped values.
    pub fn same_value(&self, other: &FlatNode) -> bool {
        match (self, other) {
            (FlatNode::Entry(a), FlatNode::Entry(b)) => a.text == b.text,
            (FlatNode::Tree(a), FlatNode::Tree(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, na), (kb, nb))| ka == kb && na.same_value(nb))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(text: &str) -> Node {
        Node::Leaf(Message::from_source_text(text).unwrap())
    }

    #[test]
    fn test_key_path_parse_and_display() {
        let path: KeyPath = "a.b_2.c".parse().unwrap();
        assert_eq!(path.segments().len(), 3);
        assert_eq!(path.to_string(), "a.b_2.c");

        assert!("".parse::<KeyPath>().is_err());
        assert!("a..b".parse::<KeyPath>().is_err());
        assert!("a.b-c".parse::<KeyPath>().is_err());
    }

    #[test]
    fn test_key_path_prefix_relations() {
        let a: KeyPath = "x.y".parse().unwrap();
        let b: KeyPath = "x.y.z".parse().unwrap();
        assert!(a.is_prefix_of(&b));
        assert!(a.is_prefix_of(&a));
        assert!(a.is_strict_ancestor_of(&b));
        assert!(!a.is_strict_ancestor_of(&a));
        assert!(!b.is_prefix_of(&a));
    }

    #[test]
    fn test_object_insert_replaces_in_place() {
        let mut object = Object::new();
        object.insert("b", leaf("one"));
        object.insert("a", leaf("two"));
        object.insert("b", leaf("three"));

        let keys: Vec<&str> = object.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(
            object.get("b").unwrap().as_leaf().unwrap().forms(),
            &["three".to_string()]
        );
    }

    #[test]
    fn test_node_child_resolves_array_indices() {
        let node = Node::Array(vec![leaf("zero"), leaf("one")]);
        assert!(node.child("1").is_some());
        assert!(node.child("2").is_none());
        assert!(node.child("x").is_none());

        let path: KeyPath = KeyPath::root().join("1");
        assert_eq!(
            node.at_path(&path).unwrap().as_leaf().unwrap().forms(),
            &["one".to_string()]
        );
    }

    #[test]
    fn test_flat_tree_set_and_remove_with_pruning() {
        let mut tree = FlatTree::new();
        let path: KeyPath = "a.b.c".parse().unwrap();
        tree.set_at_path(&path, FlatNode::entry("hello", None))
            .unwrap();
        assert!(tree.at_path(&path).is_some());

        tree.remove_at_path(&path);
        assert!(tree.is_empty(), "emptied ancestors should be pruned");
    }

    #[test]
    fn test_flat_tree_set_through_entry_fails() {
        let mut tree = FlatTree::new();
        tree.insert("a", FlatNode::entry("hello", None));
        let path: KeyPath = "a.b".parse().unwrap();
        assert!(tree.set_at_path(&path, FlatNode::entry("x", None)).is_err());
    }

    #[test]
    fn test_flat_node_same_value_ignores_comments() {
        let a = FlatNode::entry("hello", Some("note".to_string()));
        let b = FlatNode::entry("hello", None);
        let c = FlatNode::entry("bye", None);
        assert!(a.same_value(&b));
        assert!(!a.same_value(&c));
    }

    #[test]
    fn test_flat_tree_sort_keys_recursive() {
        let mut inner = FlatTree::new();
        inner.insert("z", FlatNode::entry("1", None));
        inner.insert("a", FlatNode::entry("2", None));
        let mut tree = FlatTree::new();
        tree.insert("b", FlatNode::Tree(inner));
        tree.insert("a", FlatNode::entry("3", None));

        tree.sort_keys_recursive();
        let keys: Vec<&str> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        if let Some(FlatNode::Tree(inner)) = tree.get("b") {
            let keys: Vec<&str> = inner.iter().map(|(k, _)| k).collect();
            assert_eq!(keys, vec!["a", "z"]);
        } else {
            panic!("expected subtree");
        }
    }
}
