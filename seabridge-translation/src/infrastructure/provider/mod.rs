pub mod scripted;

pub use scripted::{ScriptedBatchProvider, ScriptedTextGenerator};
