//! HTTP handlers: thin marshaling between requests and the engine.

pub mod resource;
pub use resource::*;
