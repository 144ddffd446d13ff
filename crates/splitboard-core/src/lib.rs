//! Core types, config, and errors for Splitboard.

pub mod config;
pub mod error;
pub mod protocol;
