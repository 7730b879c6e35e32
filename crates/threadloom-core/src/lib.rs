//! Domain types shared by every crate in the workspace: the message,
//! thread, classification, and article records described by the data
//! model, plus the crate-wide error type.

pub mod error;
pub mod model;

pub use error::{Error, Result};
pub use model::*;
