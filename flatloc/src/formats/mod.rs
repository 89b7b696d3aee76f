//! The two file formats flatloc reads and writes.
//!
//! [`source`] is the authored messages file: JSON restricted to objects,
//! arrays and string leaves, extended with comments. [`flat`] is the flat
//! translation-service document, plain JSON.

pub mod flat;
pub mod source;

pub use flat::Format as FlatFormat;
pub use source::SourceFile;
