pub mod api;
pub mod cache;
pub mod dedup;
pub mod feed;
pub mod fetch;
pub mod merge;
pub mod parser;
pub mod resolve;
pub mod snapshot;
