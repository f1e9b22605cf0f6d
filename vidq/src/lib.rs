//! vidq library crate.
//!
//! Queue media locators, resolve their metadata, then fetch the best video
//! and audio streams and remux them losslessly into a single container,
//! one item at a time.

pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod panic_hook;
pub mod pipeline;
pub mod queue;
pub mod remux;
pub mod resolver;
pub mod selector;
pub mod utils;

pub use error::{Error, Result};
