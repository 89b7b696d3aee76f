//! Per-component message fragments.
//!
//! A component ships its messages in its own authored fragment. Before
//! processing, every fragment is merged into the main tree under the
//! reserved `component` section, so its flat keys come out as
//! `component.<name>.<key>`. After import, the component's translated
//! subtree is spliced back into the component's artifact file inside a
//! delimited autogenerated block.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::{
    error::Error,
    formats::source::SourceFile,
    types::{KeyPath, Node, Object},
};

/// The reserved top-level section holding merged component fragments.
pub const COMPONENT_SECTION: &str = "component";

lazy_static! {
    static ref REGION: Regex =
        Regex::new(r"(?s)<i18n>\n.*?\n</i18n>\n?").expect("valid regex");
}

/// Merges component fragments into the main source file under
/// [`COMPONENT_SECTION`], prefixing their comment paths accordingly.
pub fn merge_components(
    source: &mut SourceFile,
    components: Vec<(String, SourceFile)>,
) -> Result<(), Error> {
    if components.is_empty() {
        return Ok(());
    }
    if source.root.contains_key(COMPONENT_SECTION) {
        return Err(Error::syntax(format!(
            "the top-level section `{}` is reserved for component fragments",
            COMPONENT_SECTION
        )));
    }

    let mut section = Object::new();
    for (name, fragment) in components {
        if name.parse::<KeyPath>().is_err() || name.contains('.') {
            return Err(Error::syntax(format!("invalid component name `{}`", name)));
        }
        if section.contains_key(&name) {
            return Err(Error::syntax(format!("duplicate component `{}`", name)));
        }
        if !fragment.header.is_empty() {
            return Err(Error::syntax(format!(
                "component `{}` may not carry a header block",
                name
            )));
        }

        let prefix = KeyPath::root().join(COMPONENT_SECTION).join(&name);
        for (path, raw) in fragment.comments {
            source.comments.insert(prefix.concat(&path), raw);
        }
        section.insert(name, Node::Object(fragment.root));
    }
    source.root.insert(COMPONENT_SECTION, Node::Object(section));
    Ok(())
}

/// Renders a component's translated subtree as the body of its autogenerated
/// block: pretty JSON with `<` escaped so the block's own delimiters stay
/// unambiguous.
pub fn region_body(value: &Value) -> Result<String, Error> {
    let text = serde_json::to_string_pretty(value)?;
    Ok(text.replace('<', "\\u003c"))
}

/// Splices an autogenerated block into a component artifact.
///
/// With a body, an existing block is replaced in place and a missing one is
/// appended; with `None` the block is removed.
pub fn splice_autogenerated(artifact: &str, body: Option<&str>) -> String {
    match body {
        Some(body) => {
            let block = format!("<i18n>\n{}\n</i18n>\n", body);
            if REGION.is_match(artifact) {
                REGION
                    .replace(artifact, regex::NoExpand(block.as_str()))
                    .into_owned()
            } else {
                let mut out = artifact.to_string();
                if !out.is_empty() {
                    if !out.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push('\n');
                }
                out.push_str(&block);
                out
            }
        }
        None => {
            if !REGION.is_match(artifact) {
                return artifact.to_string();
            }
            let stripped = REGION.replace(artifact, "").into_owned();
            let trimmed = stripped.trim_end_matches('\n');
            if trimmed.is_empty() {
                String::new()
            } else {
                format!("{}\n", trimmed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{comment::CommentStyle, message::Message, traits::Parser};
    use indoc::indoc;
    use serde_json::json;

    fn fragment(text: &str) -> SourceFile {
        SourceFile::from_str(text).unwrap()
    }

    #[test]
    fn test_merge_places_fragments_under_reserved_section() {
        let mut source = fragment(r#"{ "greeting": { "hello": "Hello!" } }"#);
        let login = fragment(indoc! {r#"
            {
              // On the submit button.
              "submit": "Sign in"
            }
        "#});

        merge_components(&mut source, vec![("login".to_string(), login)]).unwrap();
        let submit = source
            .root
            .get(COMPONENT_SECTION)
            .and_then(Node::as_object)
            .and_then(|o| o.get("login"))
            .and_then(Node::as_object)
            .and_then(|o| o.get("submit"))
            .and_then(Node::as_leaf)
            .unwrap();
        assert_eq!(submit.forms(), ["Sign in"]);

        // The fragment's comment moved with it.
        let raw = &source.comments[&"component.login.submit".parse().unwrap()];
        assert_eq!(raw.fragments()[0].0, CommentStyle::Line);
    }

    #[test]
    fn test_merge_rejects_duplicates_and_reserved_use() {
        let mut source = fragment(r#"{ "component": { "x": "Taken" } }"#);
        let login = fragment(r#"{ "submit": "Sign in" }"#);
        assert!(merge_components(&mut source, vec![("login".to_string(), login)]).is_err());

        let mut source = fragment(r#"{ "greeting": { "hello": "Hello!" } }"#);
        let a = fragment(r#"{ "x": "One" }"#);
        let b = fragment(r#"{ "y": "Two" }"#);
        assert!(
            merge_components(
                &mut source,
                vec![("login".to_string(), a), ("login".to_string(), b)]
            )
            .is_err()
        );
    }

    #[test]
    fn test_merge_rejects_invalid_name() {
        let mut source = fragment(r#"{ "greeting": { "hello": "Hello!" } }"#);
        let login = fragment(r#"{ "x": "One" }"#);
        assert!(
            merge_components(&mut source, vec![("bad name".to_string(), login)]).is_err()
        );
    }

    #[test]
    fn test_merged_tree_keeps_message_semantics() {
        let mut source = fragment(r#"{ "greeting": { "hello": "Hello!" } }"#);
        let counter = fragment(r#"{ "count": "{n} one | {n} many" }"#);
        merge_components(&mut source, vec![("counter".to_string(), counter)]).unwrap();

        let count = source
            .root
            .get(COMPONENT_SECTION)
            .and_then(Node::as_object)
            .and_then(|o| o.get("counter"))
            .and_then(Node::as_object)
            .and_then(|o| o.get("count"))
            .and_then(Node::as_leaf)
            .unwrap();
        assert_eq!(count, &Message::from_source_text("{n} one | {n} many").unwrap());
    }

    #[test]
    fn test_region_body_escapes_angle_bracket() {
        let body = region_body(&json!({ "a": "1 < 2 </i18n>" })).unwrap();
        assert!(!body.contains('<'));
        assert!(body.contains("\\u003c"));
    }

    #[test]
    fn test_splice_appends_block() {
        let artifact = "fn render() {}\n";
        let out = splice_autogenerated(artifact, Some("{\n  \"a\": \"x\"\n}"));
        assert_eq!(
            out,
            "fn render() {}\n\n<i18n>\n{\n  \"a\": \"x\"\n}\n</i18n>\n"
        );
    }

    #[test]
    fn test_splice_replaces_existing_block() {
        let artifact = "top\n\n<i18n>\n{ \"old\": true }\n</i18n>\n\nbottom\n";
        let out = splice_autogenerated(artifact, Some("new"));
        assert_eq!(out, "top\n\n<i18n>\nnew\n</i18n>\n\nbottom\n");
    }

    #[test]
    fn test_splice_removes_block() {
        let artifact = "top\n\n<i18n>\n{ \"old\": true }\n</i18n>\n";
        assert_eq!(splice_autogenerated(artifact, None), "top\n");
        assert_eq!(splice_autogenerated("top\n", None), "top\n");
    }
}
