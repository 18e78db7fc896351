//! Release name intelligence
//!
//! Turns scene-style release strings into structured [`Release`]
//! metadata, memoises the results in a bounded LRU cache, classifies
//! releases into indexer content categories, and builds safe Torznab
//! queries for names the grammar cannot fully describe.
//!
//! [`Release`]: reseed_core::Release

pub mod cache;
pub mod classify;
pub mod parser;
pub mod query;
mod tokens;

pub use cache::ReleaseCache;
pub use classify::{classify, ContentClass, ContentType, MediaType, SearchType};
pub use parser::parse_release;
pub use query::build_search_query;
