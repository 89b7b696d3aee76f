//! Walking a translated tree in lockstep with its source tree: repair
//! passes, content validation, and serialization to the nested output
//! format.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::{
    error::Error,
    interpolation::is_composite_group,
    locale::{LocaleConfig, PluralCategory},
    message::{LINK_PREFIX, Message},
    types::{KeyPath, Node, Object},
};

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\w+\}").expect("valid regex");
}

/// A non-fatal finding from translation validation. Warnings never stop the
/// import; the caller decides how to surface them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub language: String,
    pub key: String,
    pub message: String,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.language, self.key, self.message)
    }
}

/// A translated tree paired with the source tree it was translated from.
///
/// Construction forces the translated tree into the source's exact shape:
/// index-keyed objects become arrays where the source has arrays, keys the
/// source does not have are dropped, and missing leaves become empty
/// messages of the source's arity. After that every pass can address both
/// trees by the same [`KeyPath`].
pub struct Translations<'a> {
    source: &'a Node,
    translated: Node,
}

impl<'a> Translations<'a> {
    pub fn new(source: &'a Node, translated: Node) -> Self {
        let translated = mirror(source, Some(translated));
        Translations { source, translated }
    }

    pub fn translated(&self) -> &Node {
        &self.translated
    }

    /// Runs `pass` once per source leaf, in depth-first source order.
    pub fn walk<F>(&mut self, mut pass: F) -> Result<(), Error>
    where
        F: FnMut(&mut Self, &KeyPath) -> Result<(), Error>,
    {
        let mut paths = Vec::new();
        collect_leaf_paths(self.source, &KeyPath::root(), &mut paths);
        for path in &paths {
            pass(self, path)?;
        }
        Ok(())
    }

    /// Blanks the node at `path`: a leaf keeps its arity with empty forms, a
    /// container is blanked recursively.
    pub fn clear(&mut self, path: &KeyPath) {
        if let Some(node) = self.translated.at_path_mut(path) {
            clear_node(node);
        }
    }

    /// An untranslated part invalidates what it belongs to: inside a
    /// composite group the whole group is blanked, inside an array every
    /// later element is blanked so the output never skips an element.
    pub fn delete_partial_translation(&mut self, path: &KeyPath) -> Result<(), Error> {
        if !self.translated_leaf(path).is_some_and(Message::is_empty) {
            return Ok(());
        }
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        match self.source.at_path(&parent) {
            Some(Node::Object(object)) if is_composite_group(object) => {
                self.clear(&parent);
            }
            Some(Node::Array(items)) => {
                let index = path
                    .last()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(0);
                for later in index + 1..items.len() {
                    self.clear(&parent.join_index(later));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Link leaves are absent from the flat document, so their translation
    /// is the source link text itself, reinstated once the link target has a
    /// translation to point at.
    pub fn copy_linked_locale_message(&mut self, path: &KeyPath) -> Result<(), Error> {
        let Some(source) = self.source_leaf(path) else {
            return Ok(());
        };
        let Some(target) = source.link_target() else {
            return Ok(());
        };
        let target_translated = self
            .translated
            .at_path(&target)
            .and_then(Node::as_leaf)
            .is_some_and(|m| !m.is_empty());
        if target_translated {
            let link = source.clone();
            if let Some(Node::Leaf(slot)) = self.translated.at_path_mut(path) {
                *slot = link;
            }
        }
        Ok(())
    }

    /// Checks a non-empty translation against its source message. Shape and
    /// placeholder mismatches are fatal; separator problems are collected as
    /// warnings.
    pub fn validate_translation(
        &self,
        path: &KeyPath,
        config: &LocaleConfig,
        warnings: &mut Vec<ValidationWarning>,
    ) -> Result<(), Error> {
        let (Some(source), Some(translated)) = (self.source_leaf(path), self.translated_leaf(path))
        else {
            return Ok(());
        };
        if translated.is_empty() {
            return Ok(());
        }

        for form in translated.forms() {
            if form.contains(LINK_PREFIX) && !source.forms().contains(form) {
                return Err(Error::translation(
                    "a form with link syntax must match the source form exactly",
                )
                .at(path));
            }
        }

        if config.categories.len() > 1 && source.is_plural() != translated.is_plural() {
            let detail = if source.is_plural() {
                "the source is pluralized but the translation is not"
            } else {
                "the translation is pluralized but the source is not"
            };
            return Err(Error::translation(detail).at(path));
        }

        if source.placeholders() != translated.placeholders() {
            return Err(Error::translation(format!(
                "placeholders do not match the source (expected {:?}, found {:?})",
                source.placeholders(),
                translated.placeholders()
            ))
            .at(path));
        }

        if config.check_placeholder_separators {
            for form in translated.forms() {
                for found in PLACEHOLDER.find_iter(form) {
                    let before_ok = form[..found.start()]
                        .chars()
                        .next_back()
                        .is_none_or(|c| !c.is_alphanumeric());
                    let after_ok = form[found.end()..]
                        .chars()
                        .next()
                        .is_none_or(|c| !c.is_alphanumeric());
                    if !before_ok || !after_ok {
                        warnings.push(ValidationWarning {
                            language: config.language.clone(),
                            key: path.to_string(),
                            message: format!(
                                "placeholder `{}` has no separator next to it in `{}`",
                                found.as_str(),
                                form
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Source-locale self-check: encoding a message to the flat text and
    /// parsing it back must reproduce the forms exactly.
    pub fn verify_roundtrip(
        &self,
        path: &KeyPath,
        categories: &[PluralCategory],
    ) -> Result<(), Error> {
        let Some(translated) = self.translated_leaf(path) else {
            return Ok(());
        };
        let flat = translated.to_flat_text().map_err(|e| e.at(path))?;
        let reparsed = Message::from_flat_text(&flat, categories).map_err(|e| e.at(path))?;
        if reparsed.forms() != translated.forms() {
            return Err(Error::translation(format!(
                "flat encoding does not round-trip (`{}` came back as `{}`)",
                translated.forms().join("`, `"),
                reparsed.forms().join("`, `")
            ))
            .at(path));
        }
        Ok(())
    }

    /// Serializes the translated tree to the nested application format.
    ///
    /// Empty leaves, emptied objects and untranslated array tails are
    /// omitted; an array that is itself an array element stays in place as
    /// `[]` so sibling indices keep their meaning.
    pub fn to_output(&self) -> Result<Value, Error> {
        Ok(output_node(&self.translated, &KeyPath::root(), false)?
            .unwrap_or(Value::Object(serde_json::Map::new())))
    }

    fn source_leaf(&self, path: &KeyPath) -> Option<&Message> {
        self.source.at_path(path).and_then(Node::as_leaf)
    }

    fn translated_leaf(&self, path: &KeyPath) -> Option<&Message> {
        self.translated.at_path(path).and_then(Node::as_leaf)
    }
}

fn mirror(source: &Node, translated: Option<Node>) -> Node {
    match source {
        Node::Leaf(message) => match translated {
            Some(Node::Leaf(existing)) => Node::Leaf(existing),
            _ => Node::Leaf(Message::empty(message.forms().len())),
        },
        Node::Array(items) => {
            let mut slots: Vec<Option<Node>> = vec![None; items.len()];
            match translated {
                // Destructured flat documents hold arrays as index-keyed
                // objects.
                Some(Node::Object(mut object)) => {
                    for (index, slot) in slots.iter_mut().enumerate() {
                        *slot = object.remove(&index.to_string());
                    }
                }
                Some(Node::Array(existing)) => {
                    for (index, node) in existing.into_iter().enumerate().take(items.len()) {
                        slots[index] = Some(node);
                    }
                }
                _ => {}
            }
            Node::Array(
                items
                    .iter()
                    .zip(slots)
                    .map(|(child, slot)| mirror(child, slot))
                    .collect(),
            )
        }
        Node::Object(object) => {
            let mut existing = match translated {
                Some(Node::Object(object)) => object,
                _ => Object::new(),
            };
            Node::Object(
                object
                    .iter()
                    .map(|(key, child)| (key.to_string(), mirror(child, existing.remove(key))))
                    .collect(),
            )
        }
    }
}

fn collect_leaf_paths(node: &Node, path: &KeyPath, out: &mut Vec<KeyPath>) {
    match node {
        Node::Leaf(_) => out.push(path.clone()),
        Node::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                collect_leaf_paths(item, &path.join_index(index), out);
            }
        }
        Node::Object(object) => {
            for (key, child) in object.iter() {
                collect_leaf_paths(child, &path.join(key), out);
            }
        }
    }
}

fn clear_node(node: &mut Node) {
    match node {
        Node::Leaf(message) => *message = Message::empty(message.forms().len()),
        Node::Array(items) => items.iter_mut().for_each(clear_node),
        Node::Object(object) => object.iter_mut().for_each(|(_, child)| clear_node(child)),
    }
}

fn output_node(node: &Node, path: &KeyPath, in_array: bool) -> Result<Option<Value>, Error> {
    match node {
        Node::Leaf(message) => {
            if message.is_empty() {
                Ok(None)
            } else {
                let text = message.to_source_text().map_err(|e| e.at(path))?;
                Ok(Some(Value::String(text)))
            }
        }
        Node::Array(items) => {
            let mut out = Vec::new();
            for (index, item) in items.iter().enumerate() {
                match output_node(item, &path.join_index(index), true)? {
                    Some(value) => out.push(value),
                    None => break,
                }
            }
            if out.is_empty() && !in_array {
                Ok(None)
            } else {
                Ok(Some(Value::Array(out)))
            }
        }
        Node::Object(object) => {
            let mut map = serde_json::Map::new();
            for (key, child) in object.iter() {
                if let Some(value) = output_node(child, &path.join(key), false)? {
                    map.insert(key.to_string(), value);
                }
            }
            if map.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Value::Object(map)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(text: &str) -> Node {
        Node::Leaf(Message::from_source_text(text).unwrap())
    }

    fn translated_leaf(text: &str, categories: &[PluralCategory]) -> Node {
        Node::Leaf(Message::from_flat_text(text, categories).unwrap())
    }

    fn object(pairs: Vec<(&str, Node)>) -> Node {
        Node::Object(
            pairs
                .into_iter()
                .map(|(key, node)| (key.to_string(), node))
                .collect(),
        )
    }

    fn en() -> Vec<PluralCategory> {
        crate::locale::default_categories_str("en")
    }

    #[test]
    fn test_mirror_reshapes_indexed_objects_to_arrays() {
        let source = object(vec![(
            "steps",
            Node::Array(vec![leaf("First"), leaf("Second")]),
        )]);
        // What destructure produces: an index-keyed object, second missing.
        let translated = object(vec![(
            "steps",
            object(vec![("0", translated_leaf("Premier", &en()))]),
        )]);

        let translations = Translations::new(&source, translated);
        match translations.translated().at_path(&"steps".parse().unwrap()) {
            Some(Node::Array(items)) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].as_leaf().unwrap().forms(), ["Premier"]);
                assert!(items[1].as_leaf().unwrap().is_empty());
            }
            other => panic!("expected array, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_mirror_prunes_unknown_keys() {
        let source = object(vec![("a", leaf("Hello"))]);
        let translated = object(vec![
            ("a", translated_leaf("Bonjour", &en())),
            ("stale", translated_leaf("gone", &en())),
        ]);
        let translations = Translations::new(&source, translated);
        assert!(
            translations
                .translated()
                .at_path(&"stale".parse().unwrap())
                .is_none()
        );
    }

    #[test]
    fn test_delete_partial_translation_clears_composite_group() {
        let source = object(vec![(
            "notice",
            object(vec![
                ("full", leaf("Read the {guide} first.")),
                ("guide", leaf("user guide")),
            ]),
        )]);
        // Only the template was translated.
        let translated = object(vec![(
            "notice",
            object(vec![(
                "full",
                translated_leaf("Lisez le {guide} d'abord.", &en()),
            )]),
        )]);

        let mut translations = Translations::new(&source, translated);
        translations
            .walk(|t, path| t.delete_partial_translation(path))
            .unwrap();
        assert!(
            translations
                .translated()
                .at_path(&"notice.full".parse().unwrap())
                .and_then(Node::as_leaf)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_delete_partial_translation_clears_array_tail() {
        let source = object(vec![(
            "steps",
            Node::Array(vec![leaf("One"), leaf("Two"), leaf("Three")]),
        )]);
        // The middle element is untranslated.
        let translated = object(vec![(
            "steps",
            object(vec![
                ("0", translated_leaf("Un", &en())),
                ("2", translated_leaf("Trois", &en())),
            ]),
        )]);

        let mut translations = Translations::new(&source, translated);
        translations
            .walk(|t, path| t.delete_partial_translation(path))
            .unwrap();
        let steps = translations
            .translated()
            .at_path(&"steps".parse().unwrap())
            .unwrap();
        match steps {
            Node::Array(items) => {
                assert!(!items[0].as_leaf().unwrap().is_empty());
                assert!(items[1].as_leaf().unwrap().is_empty());
                assert!(items[2].as_leaf().unwrap().is_empty(), "tail cleared");
            }
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn test_copy_linked_message_when_target_translated() {
        let source = object(vec![
            ("a", object(vec![("x", leaf("Hello"))])),
            ("b", object(vec![("y", leaf("@:a.x"))])),
        ]);
        let translated = object(vec![(
            "a",
            object(vec![("x", translated_leaf("Bonjour", &en()))]),
        )]);

        let mut translations = Translations::new(&source, translated);
        translations
            .walk(|t, path| t.copy_linked_locale_message(path))
            .unwrap();
        assert_eq!(
            translations
                .translated()
                .at_path(&"b.y".parse().unwrap())
                .and_then(Node::as_leaf)
                .unwrap()
                .forms(),
            ["@:a.x"]
        );
    }

    #[test]
    fn test_linked_message_stays_empty_without_target() {
        let source = object(vec![
            ("a", object(vec![("x", leaf("Hello"))])),
            ("b", object(vec![("y", leaf("@:a.x"))])),
        ]);
        let translated = object(vec![]);

        let mut translations = Translations::new(&source, translated);
        translations
            .walk(|t, path| t.copy_linked_locale_message(path))
            .unwrap();
        assert!(
            translations
                .translated()
                .at_path(&"b.y".parse().unwrap())
                .and_then(Node::as_leaf)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_validate_placeholder_mismatch() {
        let source = object(vec![("a", leaf("Hello {name}"))]);
        let translated = object(vec![("a", translated_leaf("Bonjour {nom}", &en()))]);

        let mut translations = Translations::new(&source, translated);
        let config = LocaleConfig::for_language("fr");
        let mut warnings = Vec::new();
        let result =
            translations.walk(|t, path| t.validate_translation(path, &config, &mut warnings));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_plural_shape_mismatch() {
        let source = object(vec![("a", leaf("{n} apple | {n} apples"))]);
        let translated = object(vec![("a", translated_leaf("des pommes", &en()))]);

        let mut translations = Translations::new(&source, translated);
        let config = LocaleConfig::for_language("fr");
        let mut warnings = Vec::new();
        let result =
            translations.walk(|t, path| t.validate_translation(path, &config, &mut warnings));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_single_category_locale_accepts_collapsed_plural() {
        let source = object(vec![("a", leaf("{n} apple | {n} apples"))]);
        let ja = crate::locale::default_categories_str("ja");
        let translated = object(vec![("a", translated_leaf("{n} 個のりんご", &ja))]);

        let mut translations = Translations::new(&source, translated);
        let config = LocaleConfig::for_language("ja");
        let mut warnings = Vec::new();
        translations
            .walk(|t, path| t.validate_translation(path, &config, &mut warnings))
            .unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_validate_separator_warning() {
        let source = object(vec![("a", leaf("Hello {name}"))]);
        let translated = object(vec![("a", translated_leaf("Bonjour{name}x", &en()))]);

        let mut translations = Translations::new(&source, translated);
        let config = LocaleConfig::for_language("fr");
        let mut warnings = Vec::new();
        translations
            .walk(|t, path| t.validate_translation(path, &config, &mut warnings))
            .unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].key, "a");
        assert!(warnings[0].message.contains("{name}"));
    }

    #[test]
    fn test_validate_altered_link_rejected() {
        let source = object(vec![
            ("a", object(vec![("x", leaf("Hello"))])),
            ("b", object(vec![("y", leaf("@:a.x"))])),
        ]);
        let translated = object(vec![
            ("a", object(vec![("x", translated_leaf("Bonjour", &en()))])),
            ("b", object(vec![("y", translated_leaf("@:a.z", &en()))])),
        ]);

        let mut translations = Translations::new(&source, translated);
        let config = LocaleConfig::for_language("fr");
        let mut warnings = Vec::new();
        let result =
            translations.walk(|t, path| t.validate_translation(path, &config, &mut warnings));
        assert!(result.is_err());
    }

    #[test]
    fn test_verify_roundtrip_accepts_clean_messages() {
        let source = object(vec![
            ("a", leaf("Hello {name}")),
            ("b", leaf("{n} apple | {n} apples")),
        ]);
        let mut translations = Translations::new(&source, source.clone());
        translations
            .walk(|t, path| t.verify_roundtrip(path, &en()))
            .unwrap();
    }

    #[test]
    fn test_to_output_shapes() {
        let source = object(vec![
            ("greeting", object(vec![("hello", leaf("Hello"))])),
            ("steps", Node::Array(vec![leaf("One"), leaf("Two")])),
            ("empty_section", object(vec![("gone", leaf("Bye"))])),
        ]);
        let translated = object(vec![
            (
                "greeting",
                object(vec![("hello", translated_leaf("Bonjour", &en()))]),
            ),
            ("steps", object(vec![("0", translated_leaf("Un", &en()))])),
        ]);

        let translations = Translations::new(&source, translated);
        let output = translations.to_output().unwrap();
        assert_eq!(
            output,
            json!({
                "greeting": { "hello": "Bonjour" },
                "steps": ["Un"],
            })
        );
    }

    #[test]
    fn test_to_output_joins_plural_forms() {
        let source = object(vec![("a", leaf("{n} apple | {n} apples"))]);
        let ru = crate::locale::default_categories_str("ru");
        let translated = object(vec![(
            "a",
            translated_leaf(
                "{count, plural, one {{n} яблоко} few {{n} яблока} many {{n} яблок} other {{n} яблока}}",
                &ru,
            ),
        )]);

        let translations = Translations::new(&source, translated);
        let output = translations.to_output().unwrap();
        assert_eq!(
            output,
            json!({ "a": "{n} яблоко | {n} яблока | {n} яблок | {n} яблока" })
        );
    }

    #[test]
    fn test_to_output_nested_empty_array_element() {
        let source = object(vec![(
            "matrix",
            Node::Array(vec![
                Node::Array(vec![leaf("a")]),
                Node::Array(vec![leaf("b")]),
            ]),
        )]);
        // Only the second inner array is translated; the first emits `[]` so
        // the second keeps its index.
        let translated = object(vec![(
            "matrix",
            object(vec![(
                "1",
                object(vec![("0", translated_leaf("bé", &en()))]),
            )]),
        )]);

        let translations = Translations::new(&source, translated);
        let output = translations.to_output().unwrap();
        assert_eq!(output, json!({ "matrix": [[], ["bé"]] }));
    }
}
