//! examkit-memory: in-memory collaborators for examkit.
//!
//! Implements the `examkit-core` collaborator traits against mutexed
//! maps, for tests and single-process embedding, plus a TOML loader for
//! quiz fixtures.

pub mod bank;
pub mod completion;
pub mod loader;
pub mod store;
pub mod transcriber;

pub use bank::InMemoryQuestionBank;
pub use completion::StaticCompletionLookup;
pub use store::InMemoryAttemptStore;
pub use transcriber::FixedTranscriber;
