#![forbid(unsafe_code)]
//! Synchronization engine between a nested application message tree and a
//! flat translation-service document.
//!
//! The authored tree (JSON with comments) is flattened into the document the
//! translation service understands, and translated documents come back
//! through validation and repair into one nested output per locale. Along
//! the way the engine resolves message links, composite message groups,
//! `@remap` key directives, and locale-specific plural category sets.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use flatloc::{Codec, LocaleConfig, formats::{FlatFormat, SourceFile}, traits::Parser};
//!
//! // Export: authored tree -> flat document.
//! let source = SourceFile::read_from("messages.jsonc")?;
//! let codec = Codec::new(source)?;
//! FlatFormat::new(codec.flat_document().clone()).write_to("flat.json")?;
//!
//! // Import: translated flat document -> nested output.
//! let translated = FlatFormat::read_from("fr.json")?;
//! let artifacts = codec.import_translations(&LocaleConfig::for_language("fr"), translated.tree)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod codec;
pub mod comment;
pub mod component;
pub mod error;
pub mod formats;
pub mod interpolation;
pub mod locale;
pub mod message;
pub mod remap;
pub mod traits;
pub mod transform;
pub mod translations;
pub mod types;

// Re-export most used types for easy consumption
pub use crate::{
    codec::{Codec, LocaleArtifacts},
    error::Error,
    locale::{LocaleConfig, PluralCategory, SOURCE_LANGUAGE},
    message::Message,
    translations::{Translations, ValidationWarning},
    types::{FlatEntry, FlatNode, FlatTree, KeyPath, Node, Object},
};
