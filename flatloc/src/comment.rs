//! Parsing of authoring comments attached to tree entries.
//!
//! Comments reach the engine out-of-band, as the raw fragments that preceded
//! an entry in the authoring file: either a run of single-line comments or
//! one block comment. A comment may open with directives (`@remap <path>`)
//! before its freeform prose; the prose becomes the translator comment of
//! the entry's flat-document leaves.

use std::collections::BTreeMap;

use crate::{error::Error, types::KeyPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    Line,
    Block,
}

/// The raw comment fragments collected in front of one entry, in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawComment {
    fragments: Vec<(CommentStyle, String)>,
}

/// A parsed attached comment: at most one remap directive, plus prose.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedComment {
    /// Target path of an `@remap` directive, when present.
    pub remap: Option<KeyPath>,

    /// The freeform prose, blank lines folded to newlines.
    pub text: Option<String>,
}

impl RawComment {
    pub fn new() -> Self {
        RawComment::default()
    }

    pub fn push(&mut self, style: CommentStyle, text: impl Into<String>) {
        self.fragments.push((style, text.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[(CommentStyle, String)] {
        &self.fragments
    }

    pub fn parse(&self) -> Result<ParsedComment, Error> {
        let lines = self.validated_lines()?;

        let mut remap = None;
        let mut index = 0;
        while index < lines.len() && lines[index].starts_with('@') {
            let line = &lines[index];
            let (name, rest) = match line.split_once(char::is_whitespace) {
                Some((name, rest)) => (name, rest.trim()),
                None => (line.as_str(), ""),
            };
            match name {
                "@remap" => {
                    if remap.is_some() {
                        return Err(Error::comment(format!(
                            "duplicate `@remap` directive in `{}`",
                            line
                        )));
                    }
                    let path: KeyPath = rest.parse().map_err(Error::Comment)?;
                    remap = Some(path);
                }
                other => {
                    return Err(Error::comment(format!("unknown directive `{}`", other)));
                }
            }
            index += 1;
        }
        if let Some(stray) = lines[index..].iter().find(|l| l.starts_with('@')) {
            return Err(Error::comment(format!(
                "directive `{}` must precede the comment prose",
                stray
            )));
        }

        let mut text = String::new();
        for line in &lines[index..] {
            if line.is_empty() {
                text.push('\n');
            } else {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push(' ');
                }
                text.push_str(line);
            }
        }
        Ok(ParsedComment {
            remap,
            text: if text.is_empty() { None } else { Some(text) },
        })
    }

    /// Flattens the fragments to trimmed lines, enforcing the style rules:
    /// line and block comments may not mix, and only one block is allowed.
    fn validated_lines(&self) -> Result<Vec<String>, Error> {
        let line_count = self
            .fragments
            .iter()
            .filter(|(s, _)| *s == CommentStyle::Line)
            .count();
        let block_count = self.fragments.len() - line_count;
        if line_count > 0 && block_count > 0 {
            return Err(Error::comment(format!(
                "mixed line and block comments in `{}`",
                self.fragments[0].1.trim()
            )));
        }
        if block_count > 1 {
            return Err(Error::comment(format!(
                "more than one block comment in `{}`",
                self.fragments[0].1.trim()
            )));
        }

        let mut lines: Vec<String> = self
            .fragments
            .iter()
            .flat_map(|(_, text)| text.lines())
            .map(|l| l.trim().to_string())
            .collect();
        while lines.first().is_some_and(|l| l.is_empty()) {
            lines.remove(0);
        }
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        Ok(lines)
    }
}

/// Parses the header block preceding the whole top-level tree: one
/// `name: text` line per top-level section.
pub fn parse_header(block: &str) -> Result<BTreeMap<String, String>, Error> {
    let mut sections = BTreeMap::new();
    for line in block.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((name, text)) = line.split_once(':') else {
            return Err(Error::comment(format!(
                "header line `{}` is not a `name: text` pair",
                line
            )));
        };
        let name = name.trim();
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::comment(format!(
                "header section `{}` has no description",
                name
            )));
        }
        if sections.insert(name.to_string(), text.to_string()).is_some() {
            return Err(Error::comment(format!(
                "header section `{}` described twice",
                name
            )));
        }
    }
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_comment(lines: &[&str]) -> RawComment {
        let mut raw = RawComment::new();
        for line in lines {
            raw.push(CommentStyle::Line, *line);
        }
        raw
    }

    fn block_comment(text: &str) -> RawComment {
        let mut raw = RawComment::new();
        raw.push(CommentStyle::Block, text);
        raw
    }

    #[test]
    fn test_parse_prose_joins_lines() {
        let parsed = line_comment(&["Shown after login.", "Keep it short."])
            .parse()
            .unwrap();
        assert_eq!(parsed.text.as_deref(), Some("Shown after login. Keep it short."));
        assert!(parsed.remap.is_none());
    }

    #[test]
    fn test_parse_blank_line_becomes_newline() {
        let parsed = block_comment("First paragraph.\n\nSecond paragraph.")
            .parse()
            .unwrap();
        assert_eq!(
            parsed.text.as_deref(),
            Some("First paragraph.\nSecond paragraph.")
        );
    }

    #[test]
    fn test_parse_remap_directive() {
        let parsed = line_comment(&["@remap errors.generic", "Shared error text."])
            .parse()
            .unwrap();
        assert_eq!(parsed.remap.unwrap().to_string(), "errors.generic");
        assert_eq!(parsed.text.as_deref(), Some("Shared error text."));
    }

    #[test]
    fn test_parse_directive_only() {
        let parsed = line_comment(&["@remap errors.generic"]).parse().unwrap();
        assert!(parsed.remap.is_some());
        assert!(parsed.text.is_none());
    }

    #[test]
    fn test_duplicate_directive_rejected() {
        let raw = line_comment(&["@remap a.b", "@remap c.d"]);
        assert!(raw.parse().is_err());
    }

    #[test]
    fn test_unknown_directive_rejected() {
        let raw = line_comment(&["@shout loudly"]);
        assert!(raw.parse().is_err());
    }

    #[test]
    fn test_directive_after_prose_rejected() {
        let raw = line_comment(&["Some prose.", "@remap a.b"]);
        assert!(raw.parse().is_err());
    }

    #[test]
    fn test_invalid_directive_path_rejected() {
        let raw = line_comment(&["@remap not a path"]);
        assert!(raw.parse().is_err());
        let raw = line_comment(&["@remap bad..path"]);
        assert!(raw.parse().is_err());
    }

    #[test]
    fn test_mixed_styles_rejected() {
        let mut raw = RawComment::new();
        raw.push(CommentStyle::Line, "one");
        raw.push(CommentStyle::Block, "two");
        assert!(raw.parse().is_err());
    }

    #[test]
    fn test_two_blocks_rejected() {
        let mut raw = RawComment::new();
        raw.push(CommentStyle::Block, "one");
        raw.push(CommentStyle::Block, "two");
        assert!(raw.parse().is_err());
    }

    #[test]
    fn test_parse_header() {
        let sections = parse_header("greetings: Landing page texts.\nerrors: Error dialogs.\n")
            .unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections["greetings"], "Landing page texts.");
    }

    #[test]
    fn test_parse_header_empty_description_rejected() {
        assert!(parse_header("greetings:").is_err());
        assert!(parse_header("no separator here").is_err());
    }
}
