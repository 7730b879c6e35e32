//! Converts platform-native events into [`threadloom_core::RawMessage`]
//! batches. [`chat`] is push-style (buffered, hashed at the boundary);
//! [`github`] is pull-style (paginated, pre-threaded per discussion).

pub mod chat;
pub mod error;
pub mod github;

pub use chat::{BatchDispatcher, ChatEvent, ChatProducer};
pub use error::{Error, Result};
pub use github::{discussion_to_messages, Discussion, GitHubDiscussionsFetcher};
