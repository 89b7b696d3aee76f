//! Message values: the ordered plural forms of one translatable unit, with
//! conversions to and from both wire encodings.
//!
//! The application tree encodes plurals as pipe-delimited text
//! (`"{n} item | {n} items"`); the flat translation-service document encodes
//! them with a `{count, plural, ...}` wrapper. A message carries 1 form
//! (singular) or one form per plural category.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{error::Error, locale::PluralCategory, types::KeyPath};

/// Separator between plural forms in the application encoding.
pub const FORM_SEPARATOR: &str = " | ";

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{(\w+)\}").expect("valid regex");
    static ref LINK: Regex = Regex::new(r"^@:(\w+(?:\.\w+)*)$").expect("valid regex");
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref PLURAL_WRAPPER_PREFIX: Regex =
        Regex::new(r"^\{\s*count\s*,\s*plural\s*,").expect("valid regex");
}

/// The marker a form uses to reference another leaf instead of carrying its
/// own text.
pub const LINK_PREFIX: &str = "@:";

/// One translatable message: 1..n ordered text variants.
///
/// Invariants, enforced on construction: either all forms are empty or none
/// are, and every form uses the exact same multiset of `{word}` placeholder
/// tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    forms: Vec<String>,
}

impl Message {
    pub fn new(forms: Vec<String>) -> Result<Self, Error> {
        if forms.is_empty() {
            return Err(Error::message("a message must have at least one form"));
        }
        let empty = forms.iter().filter(|f| f.is_empty()).count();
        if empty != 0 && empty != forms.len() {
            return Err(Error::message(
                "either all forms of a message are empty or none are",
            ));
        }
        let first = placeholder_multiset(&forms[0])?;
        for form in &forms[1..] {
            let tokens = placeholder_multiset(form)?;
            if tokens != first {
                return Err(Error::message(format!(
                    "placeholder mismatch between forms: [{}] vs [{}]",
                    first.join(", "),
                    tokens.join(", ")
                )));
            }
        }
        Ok(Message { forms })
    }

    /// A message of `n` empty forms.
    pub fn empty(n: usize) -> Self {
        Message {
            forms: vec![String::new(); n.max(1)],
        }
    }

    /// Parses the pipe-delimited application encoding.
    pub fn from_source_text(text: &str) -> Result<Self, Error> {
        let segments: Vec<&str> = text.split(FORM_SEPARATOR).collect();
        if segments.len() > 2 {
            return Err(Error::message(format!(
                "more than two plural forms in `{}`",
                text
            )));
        }
        for segment in &segments {
            if segment.contains('|') {
                return Err(Error::message(format!(
                    "stray `|` in plural form `{}`; forms are separated by `{}`",
                    segment, FORM_SEPARATOR
                )));
            }
            if segment.trim() != *segment {
                return Err(Error::message(format!(
                    "leading or trailing whitespace in plural form `{}`",
                    segment
                )));
            }
            if WHITESPACE_RUN
                .find_iter(segment)
                .any(|m| m.as_str().len() > 1)
            {
                return Err(Error::message(format!(
                    "doubled whitespace in plural form `{}`",
                    segment
                )));
            }
        }
        Message::new(segments.into_iter().map(str::to_string).collect())
    }

    /// Parses the flat document encoding against a locale's expected
    /// category set. Text that is not a plural wrapper is a single form.
    /// Forms are trimmed and internal whitespace runs are collapsed.
    pub fn from_flat_text(text: &str, categories: &[PluralCategory]) -> Result<Self, Error> {
        match parse_plural_wrapper(text)? {
            Some(forms) => {
                let got: Vec<PluralCategory> = forms.keys().copied().collect();
                let mut expected: Vec<PluralCategory> = categories.to_vec();
                expected.sort();
                if got != expected {
                    return Err(Error::translation(format!(
                        "plural categories [{}] do not match the locale's [{}]; \
                         the document may contain categories downloaded untranslated",
                        join_categories(&got),
                        join_categories(&expected),
                    )));
                }
                Message::new(forms.values().map(|f| normalize_whitespace(f)).collect())
            }
            None => Message::new(vec![normalize_whitespace(text)]),
        }
    }

    pub fn forms(&self) -> &[String] {
        &self.forms
    }

    pub fn first_form(&self) -> &str {
        &self.forms[0]
    }

    /// The non-singular form when pluralized, the sole form otherwise.
    pub fn last_form(&self) -> &str {
        self.forms.last().expect("a message has at least one form")
    }

    pub fn is_plural(&self) -> bool {
        self.forms.len() > 1
    }

    pub fn is_empty(&self) -> bool {
        self.forms[0].is_empty()
    }

    /// Sorted placeholder-token multiset shared by all forms.
    pub fn placeholders(&self) -> Vec<String> {
        placeholder_multiset(&self.forms[0]).expect("validated on construction")
    }

    /// The link target when this message's sole form is a link reference.
    pub fn link_target(&self) -> Option<KeyPath> {
        if self.forms.len() != 1 {
            return None;
        }
        let captures = LINK.captures(&self.forms[0])?;
        captures[1].parse().ok()
    }

    /// True when any form contains the link marker anywhere.
    pub fn contains_link_syntax(&self) -> bool {
        self.forms.iter().any(|f| f.contains(LINK_PREFIX))
    }

    /// Joins the forms into the pipe-delimited application encoding.
    pub fn to_source_text(&self) -> Result<String, Error> {
        if self.forms.iter().any(|f| f.contains('|')) {
            return Err(Error::message(format!(
                "form contains the `|` separator: `{}`",
                self.forms.join(" / ")
            )));
        }
        Ok(self.forms.join(FORM_SEPARATOR))
    }

    /// Encodes the message for the flat document. Pluralized messages use the
    /// fixed `one`/`other` wrapper of the authoring language.
    pub fn to_flat_text(&self) -> Result<String, Error> {
        for form in &self.forms {
            if form.contains('"') || form.contains('#') {
                return Err(Error::message(format!(
                    "form contains a character reserved by the plural encoding: `{}`",
                    form
                )));
            }
        }
        match self.forms.as_slice() {
            [sole] => Ok(sole.clone()),
            [one, other] => Ok(format!(
                "{{count, plural, one {{{}}} other {{{}}}}}",
                one, other
            )),
            _ => Err(Error::message(format!(
                "cannot encode {} forms for the flat document",
                self.forms.len()
            ))),
        }
    }
}

fn join_categories(categories: &[PluralCategory]) -> String {
    categories
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// Collects the `{word}` tokens of one form, sorted. Repetitions count;
/// order does not. Unbalanced braces are an error.
fn placeholder_multiset(form: &str) -> Result<Vec<String>, Error> {
    let mut depth = 0i32;
    for c in form.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(Error::message(format!("unbalanced braces in `{}`", form)));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Error::message(format!("unbalanced braces in `{}`", form)));
    }
    let mut tokens: Vec<String> = PLACEHOLDER
        .captures_iter(form)
        .map(|c| c[1].to_string())
        .collect();
    tokens.sort();
    Ok(tokens)
}

/// Parses `{count, plural, <cat> {<form>} ...}` by brace-balanced scanning.
/// Returns `None` when the text is not a plural wrapper at all.
fn parse_plural_wrapper(text: &str) -> Result<Option<BTreeMap<PluralCategory, String>>, Error> {
    let trimmed = text.trim();
    let Some(prefix) = PLURAL_WRAPPER_PREFIX.find(trimmed) else {
        return Ok(None);
    };
    let bad = |detail: &str| {
        Error::translation(format!("malformed plural wrapper `{}`: {}", trimmed, detail))
    };

    let chars: Vec<char> = trimmed.chars().collect();
    let mut i = prefix.end();
    let mut forms = BTreeMap::new();
    loop {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            return Err(bad("missing closing brace"));
        }
        if chars[i] == '}' {
            i += 1;
            break;
        }
        // Category word.
        let start = i;
        while i < chars.len() && chars[i].is_alphanumeric() {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect();
        if word.is_empty() {
            return Err(bad("expected a category name"));
        }
        let category: PluralCategory = word.parse().map_err(|e: String| bad(&e))?;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() || chars[i] != '{' {
            return Err(bad(&format!("expected `{{` after category `{}`", word)));
        }
        i += 1;
        // Brace-balanced form capture.
        let mut depth = 1;
        let form_start = i;
        while i < chars.len() && depth > 0 {
            match chars[i] {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            i += 1;
        }
        if depth > 0 {
            return Err(bad(&format!("unbalanced braces in category `{}`", word)));
        }
        let form: String = chars[form_start..i - 1].iter().collect();
        if forms.insert(category, form).is_some() {
            return Err(bad(&format!("duplicate category `{}`", word)));
        }
    }
    if chars[i..].iter().any(|c| !c.is_whitespace()) {
        return Err(bad("trailing text after the wrapper"));
    }
    if forms.is_empty() {
        return Err(bad("no categories"));
    }
    Ok(Some(forms))
}
