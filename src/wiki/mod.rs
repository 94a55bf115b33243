//! Everything Honkai Impact 3 wiki: markup translation, domain models,
//! the remote API client, the cache layer and the request orchestrator.

pub mod cache;
pub mod client;
pub mod constants;
pub mod markup;
pub mod model;
pub mod orchestrator;
pub mod render;
