//! The two directions of the tree transformation: `restructure` turns the
//! authored application tree into the flat translation document, and
//! `destructure` turns a flat document back into a tree.
//!
//! Restructuring resolves comment inheritance, synthesizes composite-group
//! comments, validates and drops link leaves, and collects `@remap`
//! directives for the remap engine. Destructuring only rebuilds shape and
//! parses each entry text against the locale's plural categories.

use std::collections::BTreeMap;

use crate::{
    comment::ParsedComment,
    error::Error,
    formats::source::SourceFile,
    interpolation::{interpolation_comments, is_composite_group},
    locale::PluralCategory,
    message::Message,
    remap::RemapDirective,
    types::{FlatEntry, FlatNode, FlatTree, KeyPath, Node, Object},
};

/// The result of flattening a source tree.
#[derive(Debug)]
pub struct Restructured {
    pub flat: FlatTree,
    pub directives: Vec<RemapDirective>,
}

/// Flattens the authored tree into the flat translation document.
pub fn restructure(source: &SourceFile) -> Result<Restructured, Error> {
    let mut parsed = BTreeMap::new();
    for (path, raw) in &source.comments {
        parsed.insert(path.clone(), raw.parse().map_err(|e| e.at(path))?);
    }

    let mut restructurer = Restructurer {
        root: &source.root,
        header: &source.header,
        parsed,
        directives: Vec::new(),
    };
    let flat = restructurer
        .visit_object(&source.root, &KeyPath::root(), None)?
        .unwrap_or_default();
    Ok(Restructured {
        flat,
        directives: restructurer.directives,
    })
}

struct Restructurer<'a> {
    root: &'a Object,
    header: &'a BTreeMap<String, String>,
    parsed: BTreeMap<KeyPath, ParsedComment>,
    directives: Vec<RemapDirective>,
}

impl Restructurer<'_> {
    fn visit_object(
        &mut self,
        object: &Object,
        path: &KeyPath,
        inherited: Option<&str>,
    ) -> Result<Option<FlatTree>, Error> {
        let generated = if is_composite_group(object) {
            Some(interpolation_comments(object, path)?)
        } else {
            None
        };
        let in_composite = generated.is_some();

        let mut out = FlatTree::new();
        for (key, child) in object.iter() {
            let child_path = path.join(key);
            self.collect_directive(&child_path);

            let effective = self
                .attached_text(&child_path)
                .or_else(|| inherited.map(str::to_string))
                .or_else(|| {
                    if path.is_root() {
                        self.header.get(key).cloned()
                    } else {
                        None
                    }
                });

            match child {
                Node::Leaf(message) => {
                    let generated = generated.as_ref().and_then(|g| g.get(key));
                    let comment = combine_comments(effective, generated);
                    if let Some(entry) =
                        self.visit_leaf(message, &child_path, comment, false, in_composite)?
                    {
                        out.insert(key, FlatNode::Entry(entry));
                    }
                }
                Node::Array(items) => {
                    if let Some(tree) =
                        self.visit_array(items, &child_path, effective.as_deref())?
                    {
                        out.insert(key, FlatNode::Tree(tree));
                    }
                }
                Node::Object(object) => {
                    if let Some(tree) =
                        self.visit_object(object, &child_path, effective.as_deref())?
                    {
                        out.insert(key, FlatNode::Tree(tree));
                    }
                }
            }
        }
        Ok(if out.is_empty() { None } else { Some(out) })
    }

    fn visit_array(
        &mut self,
        items: &[Node],
        path: &KeyPath,
        inherited: Option<&str>,
    ) -> Result<Option<FlatTree>, Error> {
        let mut out = FlatTree::new();
        for (index, item) in items.iter().enumerate() {
            let child_path = path.join_index(index);
            self.collect_directive(&child_path);

            let effective = self
                .attached_text(&child_path)
                .or_else(|| inherited.map(str::to_string));
            let key = index.to_string();

            match item {
                Node::Leaf(message) => {
                    if let Some(entry) =
                        self.visit_leaf(message, &child_path, effective, true, false)?
                    {
                        out.insert(&key, FlatNode::Entry(entry));
                    }
                }
                Node::Array(items) => {
                    if let Some(tree) =
                        self.visit_array(items, &child_path, effective.as_deref())?
                    {
                        out.insert(&key, FlatNode::Tree(tree));
                    }
                }
                Node::Object(object) => {
                    if let Some(tree) =
                        self.visit_object(object, &child_path, effective.as_deref())?
                    {
                        out.insert(&key, FlatNode::Tree(tree));
                    }
                }
            }
        }
        Ok(if out.is_empty() { None } else { Some(out) })
    }

    fn visit_leaf(
        &self,
        message: &Message,
        path: &KeyPath,
        comment: Option<String>,
        in_array: bool,
        in_composite: bool,
    ) -> Result<Option<FlatEntry>, Error> {
        if let Some(target) = message.link_target() {
            if in_array {
                return Err(
                    Error::Link("a link may not be an array element".to_string()).at(path)
                );
            }
            if in_composite {
                return Err(Error::Link(
                    "a link may not be part of a composite group".to_string(),
                )
                .at(path));
            }
            match self.lookup(&target) {
                None => {
                    return Err(Error::Link(format!("target `{}` does not exist", target))
                        .at(path));
                }
                Some(Node::Leaf(resolved)) => {
                    if resolved.link_target().is_some() {
                        return Err(Error::Link(format!(
                            "target `{}` is itself a link",
                            target
                        ))
                        .at(path));
                    }
                }
                Some(_) => {
                    return Err(Error::Link(format!(
                        "target `{}` is not a message",
                        target
                    ))
                    .at(path));
                }
            }
            // Link leaves are not translated separately; they are filled
            // back in per locale after import.
            return Ok(None);
        }
        if message.contains_link_syntax() {
            return Err(
                Error::Link("`@:` is only allowed as the entire message".to_string()).at(path),
            );
        }

        let text = message.to_flat_text().map_err(|e| e.at(path))?;
        Ok(Some(FlatEntry { text, comment }))
    }

    fn attached_text(&self, path: &KeyPath) -> Option<String> {
        self.parsed.get(path).and_then(|p| p.text.clone())
    }

    fn collect_directive(&mut self, path: &KeyPath) {
        let target = self.parsed.get(path).and_then(|p| p.remap.clone());
        if let Some(target) = target {
            let commented = self
                .parsed
                .iter()
                .any(|(p, c)| path.is_prefix_of(p) && c.text.is_some());
            self.directives.push(RemapDirective {
                source: path.clone(),
                target,
                commented,
            });
        }
    }

    fn lookup(&self, path: &KeyPath) -> Option<&Node> {
        let mut segments = path.segments().iter();
        let mut node = self.root.get(segments.next()?)?;
        for segment in segments {
            node = node.child(segment)?;
        }
        Some(node)
    }
}

fn combine_comments(effective: Option<String>, generated: Option<&String>) -> Option<String> {
    match (effective, generated) {
        (Some(text), Some(generated)) => Some(format!("{}\n\n{}", text, generated)),
        (Some(text), None) => Some(text),
        (None, Some(generated)) => Some(generated.clone()),
        (None, None) => None,
    }
}

/// Rebuilds a tree from a flat document. Every entry text is parsed against
/// the locale's plural categories; containers become objects (index-keyed
/// ones included, the caller reshapes those against the source tree).
pub fn destructure(flat: &FlatTree, categories: &[PluralCategory]) -> Result<Node, Error> {
    destructure_tree(flat, categories, &KeyPath::root())
}

fn destructure_tree(
    flat: &FlatTree,
    categories: &[PluralCategory],
    path: &KeyPath,
) -> Result<Node, Error> {
    let mut object = Object::new();
    for (key, node) in flat.iter() {
        let child_path = path.join(key);
        let child = match node {
            FlatNode::Entry(entry) => Node::Leaf(
                Message::from_flat_text(&entry.text, categories)
                    .map_err(|e| e.at(&child_path))?,
            ),
            FlatNode::Tree(tree) => destructure_tree(tree, categories, &child_path)?,
        };
        object.insert(key, child);
    }
    Ok(Node::Object(object))
}
