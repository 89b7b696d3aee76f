//! Composite message groups: one message assembled by inserting sibling
//! messages at named placeholders.
//!
//! A group is an object whose `full` leaf is the template; every other
//! sibling must be referenced by a `{key}` placeholder in exactly one
//! sibling's text, which makes it that sibling's child. Each part is
//! translated independently, so the group's flat-document entries get
//! synthesized comments explaining where each part lands.

use std::collections::BTreeMap;

use crate::{
    error::Error,
    message::Message,
    types::{KeyPath, Node, Object},
};

/// The distinguished sibling holding the template text.
pub const TEMPLATE_KEY: &str = "full";

/// True when `object` is a composite group.
pub fn is_composite_group(object: &Object) -> bool {
    matches!(object.get(TEMPLATE_KEY), Some(Node::Leaf(_)))
}

struct Part<'a> {
    key: &'a str,
    message: &'a Message,
    children: Vec<usize>,
}

/// Builds the parent/child tree of a composite group and synthesizes one
/// translator comment per sibling key.
pub fn interpolation_comments(
    group: &Object,
    path: &KeyPath,
) -> Result<BTreeMap<String, String>, Error> {
    let mut parts = Vec::new();
    for (key, node) in group.iter() {
        let Node::Leaf(message) = node else {
            return Err(Error::Composite(format!(
                "`{}` contains the non-message entry `{}`",
                path, key
            )));
        };
        parts.push(Part {
            key,
            message,
            children: Vec::new(),
        });
    }

    let root = parts
        .iter()
        .position(|p| p.key == TEMPLATE_KEY)
        .expect("caller checked is_composite_group");

    // Attach every non-template part to the unique sibling referencing it.
    for index in 0..parts.len() {
        if index == root {
            continue;
        }
        let token = format!("{{{}}}", parts[index].key);
        let referers: Vec<usize> = parts
            .iter()
            .enumerate()
            .filter(|(_, p)| p.message.first_form().contains(&token))
            .map(|(i, _)| i)
            .collect();
        match referers.as_slice() {
            [] => {
                return Err(Error::Composite(format!(
                    "no sibling of `{}` inserts `{}`",
                    path, token
                )));
            }
            [parent] => parts[*parent].children.push(index),
            _ => {
                return Err(Error::Composite(format!(
                    "several siblings of `{}` insert `{}`",
                    path, token
                )));
            }
        }
    }

    if parts[root].children.is_empty() {
        return Err(Error::Composite(format!(
            "`{}.{}` inserts no sibling message",
            path, TEMPLATE_KEY
        )));
    }
    let mut reachable = vec![false; parts.len()];
    mark_reachable(&parts, root, &mut reachable);
    if reachable.iter().any(|r| !r) {
        return Err(Error::Composite(format!(
            "`{}` has parts unreachable from `{}` (reference cycle)",
            path, TEMPLATE_KEY
        )));
    }

    let mut comments = BTreeMap::new();
    describe_insertion_point(&parts, root, parts[root].message.last_form(), &mut comments);
    annotate_translated_parts(&parts, root, &mut comments);
    Ok(comments)
}

fn mark_reachable(parts: &[Part], index: usize, reachable: &mut [bool]) {
    reachable[index] = true;
    for &child in &parts[index].children {
        mark_reachable(parts, child, reachable);
    }
}

/// Downward pass: tell the translator of each part where its text is
/// inserted, quoting the surrounding text with ancestor placeholders already
/// substituted.
fn describe_insertion_point(
    parts: &[Part],
    index: usize,
    context: &str,
    comments: &mut BTreeMap<String, String>,
) {
    for &child in &parts[index].children {
        let key = parts[child].key;
        let heading = if parts[index].message.is_plural() {
            format!(
                "This text is inserted at {{{}}} in the plural form of the following text:",
                key
            )
        } else {
            format!("This text is inserted at {{{}}} in the following text:", key)
        };
        comments.insert(key.to_string(), format!("{}\n\n{}", heading, context));

        let expanded = context.replace(
            &format!("{{{}}}", key),
            parts[child].message.last_form(),
        );
        describe_insertion_point(parts, child, &expanded, comments);
    }
}

/// Upward pass: tell the translator of each containing text which of its
/// placeholders hold separately translated strings.
fn annotate_translated_parts(
    parts: &[Part],
    index: usize,
    comments: &mut BTreeMap<String, String>,
) {
    let children = &parts[index].children;
    if children.is_empty() {
        return;
    }

    let annotation = match children.as_slice() {
        [only] if parts[*only].children.is_empty() => format!(
            "The text inserted at {{{}}} is a separate string translated below:\n{}",
            parts[*only].key,
            parts[*only].message.last_form()
        ),
        _ => {
            let mut lines =
                vec!["The following parts are separate strings translated below:".to_string()];
            let mut descendants = Vec::new();
            collect_descendants(parts, index, &mut descendants);
            for part in descendants {
                lines.push(format!(
                    "- {{{}}}: {}",
                    parts[part].key,
                    parts[part].message.last_form()
                ));
            }
            lines.join("\n")
        }
    };

    let slot = comments.entry(parts[index].key.to_string()).or_default();
    if !slot.is_empty() {
        slot.push_str("\n\n");
    }
    slot.push_str(&annotation);

    for &child in children {
        if !parts[child].children.is_empty() {
            annotate_translated_parts(parts, child, comments);
        }
    }
}

fn collect_descendants(parts: &[Part], index: usize, out: &mut Vec<usize>) {
    for &child in &parts[index].children {
        out.push(child);
        collect_descendants(parts, child, out);
    }
}
