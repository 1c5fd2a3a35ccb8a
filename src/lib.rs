#[cfg(not(unix))]
compile_error!("reed drives mpv over a Unix socket and only builds on Unix targets");

pub mod app;
pub mod backend;
pub mod config;
pub mod core;
pub mod error;
pub mod input;
pub mod keys;
pub mod library;
pub mod logging;
pub mod model;
pub mod signal;
pub mod ui;
pub mod view;

pub use error::{Error, Result};
