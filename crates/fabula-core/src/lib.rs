//! Fabula Core — shared domain types and abstractions.
//!
//! This crate defines the entities, error taxonomy and the traits that the
//! storage, generation and application crates meet at. It contains no
//! infrastructure code.

pub mod command;
pub mod error;
pub mod generation;
pub mod model;
pub mod repository;
