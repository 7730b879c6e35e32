//! Turns a continuous stream of raw messages into batches and runs each
//! batch through the extraction pipeline. [`StreamBuffer`] groups
//! messages per channel until a batch threshold fires; [`BatchWorkerPool`]
//! processes one drained batch at a time.

pub mod buffer;
pub mod error;
pub mod sink;
pub mod worker;

pub use buffer::{StreamBuffer, BATCH_SIZE, BATCH_WINDOW_SECONDS};
pub use error::{Error, Result};
pub use sink::ArticleSink;
pub use worker::{BatchOutcome, BatchWorkerPool};
