/*
[INPUT]:  HTTP client configuration and log service endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - log service communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod client;
pub mod error;
pub mod query;
pub mod queue;
pub mod tail;

pub use error::{Result, TailboardError};

pub use client::{ClientConfig, TailClient};
pub use tail::{tail_path, topic_path};
