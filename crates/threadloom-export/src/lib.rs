//! Packages visible articles as a dataset export: a JSONL file plus a
//! C2PA-style provenance manifest, grounded on the reference signing
//! scheme (hash the canonical manifest JSON; an external KMS would
//! replace this in production).

pub mod error;
pub mod manifest;
pub mod packager;

pub use error::{Error, Result};
pub use manifest::{create_manifest, sign_manifest, Manifest};
pub use packager::{build_jsonl, package, PackagedExport};
