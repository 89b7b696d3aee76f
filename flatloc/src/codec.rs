//! The high-level orchestrator tying the pipeline together.
//!
//! Export direction: authored tree -> flat document (restructure, remap,
//! source-locale self-check). Import direction: translated flat document ->
//! per-locale nested output plus per-component region bodies.

use serde_json::Value;

use crate::{
    component::{COMPONENT_SECTION, region_body},
    error::Error,
    formats::source::SourceFile,
    locale::{LocaleConfig, SOURCE_LANGUAGE, default_categories_str},
    remap::{self, RemapDirective},
    transform::{Restructured, destructure, restructure},
    translations::{Translations, ValidationWarning},
    types::{FlatTree, Node},
};

/// Everything produced by importing one locale.
#[derive(Debug)]
pub struct LocaleArtifacts {
    pub language: String,

    /// The nested output for the main messages file; `None` when nothing
    /// outside the component section was translated.
    pub primary: Option<Value>,

    /// One entry per component in source order: the rendered region body, or
    /// `None` when the component has no translated content.
    pub components: Vec<(String, Option<String>)>,

    pub warnings: Vec<ValidationWarning>,
}

/// A validated source tree together with its flat document.
///
/// Construction runs the whole export pipeline and the source-locale
/// self-check, so holding a `Codec` means the authored file is consistent:
/// messages parse, links resolve, composite groups are well formed, remaps
/// are conflict-free, and every message round-trips through the flat
/// encoding.
pub struct Codec {
    root: Node,
    original_flat: FlatTree,
    flat: FlatTree,
    directives: Vec<RemapDirective>,
}

impl Codec {
    pub fn new(source: SourceFile) -> Result<Self, Error> {
        let Restructured { flat, directives } = restructure(&source)?;
        remap::validate(&directives, &flat)?;
        let original_flat = flat.clone();
        let mut flat = flat;
        remap::rekey_source(&mut flat, &directives)?;

        let codec = Codec {
            root: Node::Object(source.root),
            original_flat,
            flat,
            directives,
        };
        codec.self_check()?;
        Ok(codec)
    }

    /// The flat document to upload to the translation service.
    pub fn flat_document(&self) -> &FlatTree {
        &self.flat
    }

    /// Runs the source language through its own import passes: link copying
    /// plus the flat-encoding round-trip check, with no output written.
    fn self_check(&self) -> Result<(), Error> {
        let categories = default_categories_str(SOURCE_LANGUAGE);
        let mut translations = Translations::new(&self.root, self.root.clone());
        translations.walk(|t, path| {
            t.copy_linked_locale_message(path)?;
            t.verify_roundtrip(path, &categories)
        })
    }

    /// Imports one locale's translated flat document.
    pub fn import_translations(
        &self,
        config: &LocaleConfig,
        mut translated: FlatTree,
    ) -> Result<LocaleArtifacts, Error> {
        remap::rekey_translations(&mut translated, &self.directives, &self.original_flat)?;
        let destructured = destructure(&translated, &config.categories)?;

        let mut translations = Translations::new(&self.root, destructured);
        translations.walk(|t, path| t.delete_partial_translation(path))?;
        let mut warnings = Vec::new();
        translations.walk(|t, path| {
            t.copy_linked_locale_message(path)?;
            t.validate_translation(path, config, &mut warnings)
        })?;

        let mut output = translations.to_output()?;
        let component_section = match &mut output {
            Value::Object(map) => map.remove(COMPONENT_SECTION),
            _ => None,
        };

        let mut components = Vec::new();
        for name in self.component_names() {
            let value = match &component_section {
                Some(Value::Object(section)) => section.get(&name),
                _ => None,
            };
            let body = value.map(region_body).transpose()?;
            components.push((name, body));
        }

        let primary = match &output {
            Value::Object(map) if map.is_empty() => None,
            _ => Some(output),
        };

        Ok(LocaleArtifacts {
            language: config.language.clone(),
            primary,
            components,
            warnings,
        })
    }

    fn component_names(&self) -> Vec<String> {
        self.root
            .as_object()
            .and_then(|o| o.get(COMPONENT_SECTION))
            .and_then(Node::as_object)
            .map(|o| o.keys().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{formats::flat::tree_from_value, traits::Parser, types::KeyPath};
    use indoc::indoc;
    use serde_json::json;

    fn codec(text: &str) -> Codec {
        Codec::new(SourceFile::from_str(text).unwrap()).unwrap()
    }

    fn flat_tree(value: Value) -> FlatTree {
        tree_from_value(&value, &KeyPath::root()).unwrap()
    }

    #[test]
    fn test_export_applies_remaps() {
        let codec = codec(indoc! {r#"
            {
              "login": {
                // @remap shared.greeting
                "hello": "Hello!"
              },
              "landing": {
                // @remap shared.greeting
                "hello": "Hello!"
              }
            }
        "#});
        let flat = codec.flat_document();
        assert!(flat.at_path(&"shared.greeting".parse().unwrap()).is_some());
        assert!(flat.get("login").is_none());
        assert!(flat.get("landing").is_none());
    }

    #[test]
    fn test_new_rejects_remap_conflicts() {
        let result = Codec::new(
            SourceFile::from_str(indoc! {r#"
                {
                  "login": {
                    // @remap shared.greeting
                    "hello": "Hello!"
                  },
                  "landing": {
                    // @remap shared.greeting
                    "hello": "Howdy!"
                  }
                }
            "#})
            .unwrap(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_import_round_trip_with_remap_and_link() {
        let codec = codec(indoc! {r#"
            {
              "login": {
                // @remap shared.greeting
                "hello": "Hello!",
                "again": "@:login.hello"
              }
            }
        "#});

        let translated = flat_tree(json!({
            "shared": { "greeting": { "text": "Bonjour!" } }
        }));
        let config = LocaleConfig::for_language("fr");
        let artifacts = codec.import_translations(&config, translated).unwrap();

        assert!(artifacts.warnings.is_empty());
        assert_eq!(
            artifacts.primary,
            Some(json!({
                "login": { "hello": "Bonjour!", "again": "@:login.hello" }
            }))
        );
    }

    #[test]
    fn test_import_splits_component_section() {
        let codec = codec(indoc! {r#"
            {
              "greeting": { "hello": "Hello!" },
              "component": {
                "login": { "submit": "Sign in" },
                "footer": { "legal": "All rights reserved" }
              }
            }
        "#});

        let translated = flat_tree(json!({
            "greeting": { "hello": { "text": "Hallo!" } },
            "component": { "login": { "submit": { "text": "Anmelden" } } }
        }));
        let config = LocaleConfig::for_language("de");
        let artifacts = codec.import_translations(&config, translated).unwrap();

        assert_eq!(
            artifacts.primary,
            Some(json!({ "greeting": { "hello": "Hallo!" } }))
        );
        assert_eq!(artifacts.components.len(), 2);
        let login = &artifacts.components[0];
        assert_eq!(login.0, "login");
        assert!(login.1.as_deref().unwrap().contains("\"submit\": \"Anmelden\""));
        // Untranslated component: no region body.
        assert_eq!(artifacts.components[1], ("footer".to_string(), None));
    }

    #[test]
    fn test_import_nothing_translated() {
        let codec = codec(r#"{ "greeting": { "hello": "Hello!" } }"#);
        let artifacts = codec
            .import_translations(&LocaleConfig::for_language("fr"), FlatTree::new())
            .unwrap();
        assert_eq!(artifacts.primary, None);
        assert!(artifacts.components.is_empty());
        assert!(artifacts.warnings.is_empty());
    }

    #[test]
    fn test_import_surfaces_warnings() {
        let codec = codec(r#"{ "greeting": { "hello": "Hello {name}!" } }"#);
        let translated = flat_tree(json!({
            "greeting": { "hello": { "text": "Bonjour{name}!" } }
        }));
        let artifacts = codec
            .import_translations(&LocaleConfig::for_language("fr"), translated)
            .unwrap();
        assert_eq!(artifacts.warnings.len(), 1);
        assert_eq!(artifacts.warnings[0].language, "fr");
        assert_eq!(artifacts.warnings[0].key, "greeting.hello");
    }
}
