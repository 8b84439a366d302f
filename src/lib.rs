//! Session-scoped request caching for a transactions approval client.
//!
//! The [`cache`] module is the API-agnostic core; [`api`] binds it to the
//! transactions endpoints and [`resources`] holds per-view state on top.

pub mod api;
pub mod cache;
pub mod config;
pub mod logging;
pub mod resources;
