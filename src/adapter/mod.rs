//! Language Adapter Framework
//!
//! An adapter turns the text of one source file into functions, dependency
//! names and markers. Python is the only analyzed language; markers are a
//! plain text scan shared by every adapter.

pub mod framework;
pub mod python;
pub mod markers;

pub use framework::{LanguageAdapter, AdapterResult};
pub use python::PythonAdapter;
pub use markers::scan_markers;
