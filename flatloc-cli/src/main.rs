mod export;
mod import;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use flatloc::PluralCategory;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Flatten an authored messages file into the translation-service
    /// document.
    Export {
        /// The authored messages file
        #[arg(short, long)]
        input: PathBuf,

        /// Component message fragments to merge, as NAME=PATH
        #[arg(short, long = "component", value_parser = parse_named_path)]
        component: Vec<(String, PathBuf)>,

        /// The flat document to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Validate one locale's translated flat document and write its nested
    /// output.
    Import {
        /// The authored messages file
        #[arg(short, long)]
        input: PathBuf,

        /// Component message fragments to merge, as NAME=PATH
        #[arg(short, long = "component", value_parser = parse_named_path)]
        component: Vec<(String, PathBuf)>,

        /// Language code of the translated document
        #[arg(short, long)]
        lang: String,

        /// The translated flat document
        #[arg(short, long)]
        translations: PathBuf,

        /// The nested messages file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Component artifact files to splice in place, as NAME=PATH
        #[arg(short, long = "artifact", value_parser = parse_named_path)]
        artifact: Vec<(String, PathBuf)>,

        /// Override the locale's plural categories (comma-separated)
        #[arg(long, value_delimiter = ',')]
        plural_categories: Option<Vec<PluralCategory>>,

        /// Skip the placeholder-separator warning for this locale
        #[arg(long)]
        no_separator_check: bool,
    },
}

/// Parses a `NAME=PATH` argument.
fn parse_named_path(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("`{}` is not a NAME=PATH pair", value)),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let result = match args.commands {
        Commands::Export {
            input,
            component,
            output,
        } => export::run(&input, &component, &output),
        Commands::Import {
            input,
            component,
            lang,
            translations,
            output,
            artifact,
            plural_categories,
            no_separator_check,
        } => import::run(import::ImportArgs {
            input,
            components: component,
            lang,
            translations,
            output,
            artifacts: artifact,
            plural_categories,
            no_separator_check,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {}", error);
            ExitCode::FAILURE
        }
    }
}
