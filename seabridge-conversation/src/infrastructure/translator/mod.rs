pub mod cascade;

pub use cascade::CascadeMessageTranslator;
