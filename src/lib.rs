//! marian-relay - translation relay for Marian engines
//!
//! Routes translation requests to one supervised `marian-server` process per
//! language pair and frames each request with a sliding sentence context.

pub mod api;
pub mod cli;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod pair;
pub mod registry;
pub mod session;
pub mod state;
pub mod text;
pub mod worker;
