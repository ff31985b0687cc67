/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public tailboard adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod http;
pub mod types;

// Re-export commonly used types from http
pub use http::{
    ClientConfig,
    Result,
    TailClient,
    TailboardError,
    tail_path,
    topic_path,
};

// Re-export all types
pub use types::*;
