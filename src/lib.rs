//! Chat backend that answers free-text questions with Bible verses.
//!
//! A message is routed to a topic from a static [`TopicStore`]; failing that,
//! a verse reference typed by the user is looked up directly, and anything
//! else gets a fixed fallback line. See [`Responder::handle`].

pub mod handler;
pub mod reference;
pub mod reply;
pub mod resolver;
pub mod topics;
pub mod verse;

#[cfg(feature = "web")]
pub mod web;

pub use handler::{Responder, ValidationError, VersePolicy};
pub use reply::{Reply, ReplyKind};
pub use resolver::{TopicMatch, rank, resolve};
pub use topics::{Topic, TopicStore, TopicStoreError};
pub use verse::{FetchError, VerseApiConfig, VerseSource, VerseText};

#[cfg(feature = "web")]
pub use verse::BibleApiClient;
