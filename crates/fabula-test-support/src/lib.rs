//! Shared test doubles for the Fabula story backend.

mod generation;
mod store;

pub use generation::{
    FailingAudioGenerator, FailingTextGenerator, StubAudioGenerator, StubTextGenerator,
};
pub use store::{FailingStore, InMemoryStore};
