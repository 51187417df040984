//! HTTP API

pub mod engines;
pub mod error;
pub mod index;
pub mod languages;
pub mod router;
pub mod translate;

pub use router::create_router;
