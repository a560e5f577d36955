pub mod config;
pub mod desk;
pub mod http;
pub mod merge;
pub mod query_cache;
pub mod remote;
pub mod stats;
pub mod store;
pub mod sync;
pub mod synth;
pub mod types;
pub mod validation;
