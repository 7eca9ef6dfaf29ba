pub mod wire;

pub use wire::{MessageStores, assemble, build_message_store, cascade_translator, initialize};
