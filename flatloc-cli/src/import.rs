use std::fs;
use std::path::PathBuf;

use flatloc::{
    Error, LocaleConfig, PluralCategory,
    component::splice_autogenerated,
    formats::FlatFormat,
    traits::Parser,
};

use crate::export::build_codec;

pub struct ImportArgs {
    pub input: PathBuf,
    pub components: Vec<(String, PathBuf)>,
    pub lang: String,
    pub translations: PathBuf,
    pub output: PathBuf,
    pub artifacts: Vec<(String, PathBuf)>,
    pub plural_categories: Option<Vec<PluralCategory>>,
    pub no_separator_check: bool,
}

pub fn run(args: ImportArgs) -> Result<(), Error> {
    let codec = build_codec(&args.input, &args.components)?;

    let mut config = LocaleConfig::for_language(&args.lang);
    if let Some(categories) = args.plural_categories {
        config = config.with_categories(categories);
    }
    if args.no_separator_check {
        config = config.without_separator_check();
    }

    let translated = FlatFormat::read_from(&args.translations)?;
    let artifacts = codec.import_translations(&config, translated.tree)?;

    for warning in &artifacts.warnings {
        eprintln!("warning: {}", warning);
    }

    match &artifacts.primary {
        Some(value) => {
            let mut text = serde_json::to_string_pretty(value)?;
            text.push('\n');
            fs::write(&args.output, text)?;
            eprintln!("Wrote {}", args.output.display());
        }
        None => {
            eprintln!(
                "No translated content for `{}`; {} not written",
                args.lang,
                args.output.display()
            );
        }
    }

    for (name, path) in &args.artifacts {
        let body = artifacts
            .components
            .iter()
            .find(|(component, _)| component == name)
            .map(|(_, body)| body.as_deref())
            .ok_or_else(|| Error::syntax(format!("unknown component `{}`", name)))?;
        let text = fs::read_to_string(path)?;
        fs::write(path, splice_autogenerated(&text, body))?;
        eprintln!("Spliced {}", path.display());
    }
    Ok(())
}
