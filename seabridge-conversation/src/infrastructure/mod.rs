pub mod broadcast;
pub mod notify;
pub mod persistence;
pub mod translator;

pub use notify::TracingNotifier;
