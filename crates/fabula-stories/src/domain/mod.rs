//! Domain layer: commands and input validation.

pub mod commands;
pub mod validation;
