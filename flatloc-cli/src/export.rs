use std::path::{Path, PathBuf};

use flatloc::{
    Codec, Error,
    component::merge_components,
    formats::{FlatFormat, SourceFile},
    traits::Parser,
};

/// Parses the authored file, merges component fragments and runs the whole
/// export validation. Shared with the import command, which needs the same
/// codec to interpret translations.
pub fn build_codec(input: &Path, components: &[(String, PathBuf)]) -> Result<Codec, Error> {
    let mut source = SourceFile::read_from(input)?;
    let mut fragments = Vec::with_capacity(components.len());
    for (name, path) in components {
        fragments.push((name.clone(), SourceFile::read_from(path)?));
    }
    merge_components(&mut source, fragments)?;
    Codec::new(source)
}

pub fn run(input: &Path, components: &[(String, PathBuf)], output: &Path) -> Result<(), Error> {
    let codec = build_codec(input, components)?;
    FlatFormat::new(codec.flat_document().clone()).write_to(output)?;
    eprintln!("Wrote {}", output.display());
    Ok(())
}
