//! The flat translation-service document: plain JSON.
//!
//! Every leaf is an object with a `"text"` member and an optional
//! `"comment"` member; any other object is a subtree. The document has no
//! arrays.

use std::io::{BufRead, Write};

use serde_json::{Map, Value};

use crate::{
    error::Error,
    traits::Parser,
    types::{FlatEntry, FlatNode, FlatTree, KeyPath},
};

/// A flat document, as read from or written to the translation service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    pub tree: FlatTree,
}

impl Format {
    pub fn new(tree: FlatTree) -> Self {
        Format { tree }
    }
}

impl Parser for Format {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let value: Value = serde_json::from_reader(reader)?;
        Ok(Format {
            tree: tree_from_value(&value, &KeyPath::root())?,
        })
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        serde_json::to_writer_pretty(&mut writer, &tree_to_value(&self.tree))?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Converts a flat tree to its JSON value.
pub fn tree_to_value(tree: &FlatTree) -> Value {
    let mut map = Map::new();
    for (key, node) in tree.iter() {
        map.insert(key.to_string(), node_to_value(node));
    }
    Value::Object(map)
}

fn node_to_value(node: &FlatNode) -> Value {
    match node {
        FlatNode::Entry(entry) => {
            let mut map = Map::new();
            map.insert("text".to_string(), Value::String(entry.text.clone()));
            if let Some(comment) = &entry.comment {
                map.insert("comment".to_string(), Value::String(comment.clone()));
            }
            Value::Object(map)
        }
        FlatNode::Tree(tree) => tree_to_value(tree),
    }
}

/// Converts a JSON value to a flat tree. An object with a string `"text"`
/// member is an entry; every other object is a subtree.
pub fn tree_from_value(value: &Value, path: &KeyPath) -> Result<FlatTree, Error> {
    let Value::Object(map) = value else {
        return Err(Error::syntax(format!("`{}` is not an object", path)));
    };
    let mut tree = FlatTree::new();
    for (key, value) in map {
        let child_path = path.join(key);
        tree.insert(key, node_from_value(value, &child_path)?);
    }
    Ok(tree)
}

fn node_from_value(value: &Value, path: &KeyPath) -> Result<FlatNode, Error> {
    match value {
        Value::Object(map) => match map.get("text") {
            Some(Value::String(text)) => {
                let comment = match map.get("comment") {
                    Some(Value::String(comment)) => Some(comment.clone()),
                    Some(_) => {
                        return Err(Error::syntax(format!(
                            "`{}` has a non-string comment",
                            path
                        )));
                    }
                    None => None,
                };
                Ok(FlatNode::Entry(FlatEntry {
                    text: text.clone(),
                    comment,
                }))
            }
            Some(_) => Err(Error::syntax(format!("`{}` has a non-string text", path))),
            None => Ok(FlatNode::Tree(tree_from_value(value, path)?)),
        },
        _ => Err(Error::syntax(format!(
            "`{}` is neither an entry nor a subtree",
            path
        ))),
    }
}
