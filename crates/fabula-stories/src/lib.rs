//! Fabula — story authoring and finalization workflows.
//!
//! Story CRUD, best-effort text generation after creation, ownership-checked
//! generation bookkeeping and the finalization workflow that turns a chosen
//! text into the story's canonical audio.

pub mod application;
pub mod domain;
