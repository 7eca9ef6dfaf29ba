pub mod job;
pub mod route;
pub mod translation;

pub use job::{
    BatchJobSubmission, JobStatus, ProviderJobDescription, ProviderJobStatus, StartJobResponse,
    TranslationJob,
};
pub use route::{ContentCharacteristics, TranslationMethod, TranslationRoute};
pub use translation::{
    GeneratedOutput, OperationOutput, ProviderTagged, RealtimeTranslation, TextOperation,
};
