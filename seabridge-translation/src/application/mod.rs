pub mod commands;
pub mod poller;
pub mod service;

pub use commands::{StartTranslationJobCommand, TranslateDocumentCommand, TranslateTextCommand};
pub use poller::{JobPoller, JobWatch, PollOutcome};
pub use service::TranslationApplicationService;
