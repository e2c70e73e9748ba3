//! Core domain + application logic for the gbingo number-drawing bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind ports
//! (traits) implemented in the adapter crate.

pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod game;
pub mod logging;
pub mod messaging;
pub mod security;
pub mod service;
pub mod utils;

pub use errors::{Error, Result};
