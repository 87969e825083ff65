//! Reference discovery for TypeScript declaration files.
//!
//! Provides a lightweight scanner that finds the modules a `.d.ts` file
//! imports or references, without a full parse.

mod scan;

pub use scan::{
    is_declaration_file, is_lib_name, scan_declaration_imports, DeclarationImport,
    DECLARATION_EXTENSIONS,
};
