pub mod event;
pub mod message;

pub use event::{ChannelEvent, MessageDelete, MessageEdit, RawEvent, UploadAnnouncement};
pub use message::{Message, MessageDraft, MessageType, TranslationVariant, Variants, variant_keys};
