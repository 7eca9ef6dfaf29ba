pub mod memory;

pub use memory::InProcessBroadcastHub;
