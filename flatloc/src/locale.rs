//! Locale configuration: the expected plural-category set per language and
//! per-locale validation toggles.
//!
//! This is static input data. The table is a curated CLDR subset covering the
//! locales the tool syncs; unknown locales fall back to `{other}` so that
//! category validation never rejects a language the table does not know.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

/// Standard CLDR plural categories, ordered canonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PluralCategory::Zero => "zero",
            PluralCategory::One => "one",
            PluralCategory::Two => "two",
            PluralCategory::Few => "few",
            PluralCategory::Many => "many",
            PluralCategory::Other => "other",
        }
    }
}

impl Display for PluralCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluralCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero" => Ok(PluralCategory::Zero),
            "one" => Ok(PluralCategory::One),
            "two" => Ok(PluralCategory::Two),
            "few" => Ok(PluralCategory::Few),
            "many" => Ok(PluralCategory::Many),
            "other" => Ok(PluralCategory::Other),
            _ => Err(format!("unknown plural category `{}`", s)),
        }
    }
}

lazy_static! {
    /// Base language subtag -> required plural categories, in canonical order.
    static ref CATEGORY_TABLE: BTreeMap<&'static str, Vec<PluralCategory>> = {
        use PluralCategory::*;
        let mut table: BTreeMap<&'static str, Vec<PluralCategory>> = BTreeMap::new();

        // Two-category languages (singular/plural only).
        for code in [
            "en", "de", "nl", "sv", "da", "nb", "nn", "no", "is", "fi", "et", "hu", "el",
            "it", "es", "pt", "ca", "eu", "gl", "af", "sw", "tr", "az", "sq", "bg", "mk",
            "fa", "hi", "bn", "gu", "ta", "te", "kn", "ml", "mr", "ur", "fr", "hy", "fil",
            "id", "ms",
        ] {
            table.insert(code, vec![One, Other]);
        }

        // Languages without a grammatical plural.
        for code in ["ja", "zh", "ko", "th", "vi", "km", "lo", "my", "yue"] {
            table.insert(code, vec![Other]);
        }

        // East Slavic and Serbo-Croatian.
        for code in ["ru", "uk", "be", "sr", "hr", "bs", "sh", "pl"] {
            table.insert(code, vec![One, Few, Many, Other]);
        }

        for code in ["cs", "sk", "lt", "ro"] {
            table.insert(code, vec![One, Few, Other]);
        }

        table.insert("sl", vec![One, Two, Few, Other]);
        table.insert("lv", vec![Zero, One, Other]);
        table.insert("ga", vec![One, Two, Few, Many, Other]);
        table.insert("ar", vec![Zero, One, Two, Few, Many, Other]);
        for code in ["he", "iw"] {
            table.insert(code, vec![One, Two, Many, Other]);
        }

        table
    };
}

/// Languages conventionally written without inter-word spaces; the
/// placeholder-separator warning defaults to off for these.
const SPACELESS: &[&str] = &["ja", "zh", "th", "km", "lo", "my", "yue"];

/// The language the application tree is authored in.
pub const SOURCE_LANGUAGE: &str = "en";

/// Returns the expected plural categories for a language identifier, in
/// canonical order. Unknown languages fall back to `{other}`.
pub fn default_categories(lang: &LanguageIdentifier) -> Vec<PluralCategory> {
    CATEGORY_TABLE
        .get(lang.language.as_str())
        .cloned()
        .unwrap_or_else(|| vec![PluralCategory::Other])
}

/// Helper for string language codes; accepts underscores, normalizes to
/// hyphen, only the base subtag selects the rule.
pub fn default_categories_str(lang: &str) -> Vec<PluralCategory> {
    let normalized = lang.replace('_', "-");
    let parsed: LanguageIdentifier = normalized
        .parse()
        .unwrap_or_else(|_| "und".parse().expect("`und` is a valid identifier"));
    default_categories(&parsed)
}

/// Per-locale configuration supplied to the import pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleConfig {
    /// Language code (e.g. "ru", "pt-BR").
    pub language: String,

    /// The plural categories a translated plural must cover, in canonical
    /// order.
    pub categories: Vec<PluralCategory>,

    /// Emit a non-fatal warning when a placeholder has no separator
    /// character adjacent to it.
    pub check_placeholder_separators: bool,
}

impl LocaleConfig {
    /// Derived defaults for a language: table-driven categories, separator
    /// check on unless the language is written without spaces.
    pub fn for_language(language: &str) -> Self {
        let normalized = language.replace('_', "-");
        let base = normalized
            .split('-')
            .next()
            .unwrap_or(language)
            .to_ascii_lowercase();
        LocaleConfig {
            language: language.to_string(),
            categories: default_categories_str(language),
            check_placeholder_separators: !SPACELESS.contains(&base.as_str()),
        }
    }

    /// The configuration of the authoring language.
    pub fn source() -> Self {
        LocaleConfig::for_language(SOURCE_LANGUAGE)
    }

    /// Overrides the derived category set.
    pub fn with_categories(mut self, categories: Vec<PluralCategory>) -> Self {
        self.categories = categories;
        self
    }

    /// Disables the placeholder-separator warning for this locale.
    pub fn without_separator_check(mut self) -> Self {
        self.check_placeholder_separators = false;
        self
    }
}
