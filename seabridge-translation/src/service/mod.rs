pub mod wire;

pub use wire::{TranslationProviders, TranslationStores, assemble, build_stores, initialize};
