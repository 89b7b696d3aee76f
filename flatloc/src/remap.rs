//! The remap engine: validating and applying `@remap` directives against the
//! flat document.
//!
//! A directive moves (or copies onto an existing key) the flat-document
//! value of its source path to its target path. Several directives may share
//! one target, in which case their values must agree; conflicting content or
//! conflicting comment ownership aborts the run.

use std::collections::BTreeMap;

use crate::{
    error::Error,
    types::{FlatTree, KeyPath},
};

/// One collected `@remap` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapDirective {
    /// The structural path the entry occupies in the source tree.
    pub source: KeyPath,

    /// The flat-document path the entry should be stored under.
    pub target: KeyPath,

    /// Whether the source entry, or any entry below it, carries an attached
    /// prose comment.
    pub commented: bool,
}

/// Validates the whole directive set against the flat document produced by
/// `restructure`, before anything is moved.
pub fn validate(directives: &[RemapDirective], flat: &FlatTree) -> Result<(), Error> {
    // No remap may nest inside another remap's source or target subtree.
    for (i, a) in directives.iter().enumerate() {
        for (j, b) in directives.iter().enumerate() {
            if i == j {
                continue;
            }
            if a.target.is_prefix_of(&b.source) || b.source.is_prefix_of(&a.target) {
                return Err(Error::remap(format!(
                    "target `{}` overlaps the remapped source `{}`",
                    a.target, b.source
                )));
            }
            if a.source.is_strict_ancestor_of(&b.source) {
                return Err(Error::remap(format!(
                    "source `{}` contains the remapped source `{}`",
                    a.source, b.source
                )));
            }
        }
    }

    let mut groups: BTreeMap<&KeyPath, Vec<&RemapDirective>> = BTreeMap::new();
    for directive in directives {
        groups.entry(&directive.target).or_default().push(directive);
    }

    for (target, group) in groups {
        let occupied = flat.at_path(target).is_some();
        let mut first_value = None;
        let mut comments = 0;
        for directive in &group {
            let Some(value) = flat.at_path(&directive.source) else {
                return Err(Error::remap(format!(
                    "source `{}` has no value to remap",
                    directive.source
                )));
            };
            match first_value {
                None => first_value = Some(value),
                Some(first) => {
                    if !first.same_value(value) {
                        return Err(Error::remap(format!(
                            "diverging values remapped to `{}` (from `{}`)",
                            target, directive.source
                        )));
                    }
                }
            }
            if directive.commented {
                comments += 1;
            }
        }
        if comments > 1 {
            return Err(Error::remap(format!(
                "more than one comment owner remapped to `{}`",
                target
            )));
        }
        if occupied && comments > 0 {
            return Err(Error::remap(format!(
                "`{}` already has a value; a remapped comment cannot override it",
                target
            )));
        }
    }
    Ok(())
}

/// Applies the directives to the source flat document, in collection order.
///
/// The first directive reaching a still-empty target materializes the value;
/// the one carrying the unique comment wins over it. Sources are deleted
/// unconditionally, and each remapped top-level section is re-sorted for
/// output stability.
pub fn rekey_source(flat: &mut FlatTree, directives: &[RemapDirective]) -> Result<(), Error> {
    for directive in directives {
        let value = flat.at_path(&directive.source).cloned().ok_or_else(|| {
            Error::remap(format!(
                "source `{}` has no value to remap",
                directive.source
            ))
        })?;
        if flat.at_path(&directive.target).is_none() || directive.commented {
            flat.set_at_path(&directive.target, value)
                .map_err(Error::Remap)?;
        }
        flat.remove_at_path(&directive.source);
    }

    let mut sections: Vec<&str> = directives.iter().filter_map(|d| d.target.head()).collect();
    sections.sort_unstable();
    sections.dedup();
    for section in sections {
        if let Some(crate::types::FlatNode::Tree(tree)) = flat.get_mut(section) {
            tree.sort_keys_recursive();
        }
    }
    Ok(())
}

/// Mirrors the directives onto a translated flat document: the translation
/// of a remapped entry moves back to the entry's structural path. Targets
/// that only existed because of the remap are removed afterwards.
pub fn rekey_translations(
    translated: &mut FlatTree,
    directives: &[RemapDirective],
    original: &FlatTree,
) -> Result<(), Error> {
    for directive in directives {
        if let Some(value) = translated.at_path(&directive.target).cloned() {
            translated
                .set_at_path(&directive.source, value)
                .map_err(Error::Remap)?;
        }
        if original.at_path(&directive.target).is_none() {
            translated.remove_at_path(&directive.target);
        }
    }
    Ok(())
}
