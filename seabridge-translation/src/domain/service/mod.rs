pub mod batch;
pub mod cascade;
pub mod document;
pub mod realtime;
pub mod routing;

pub use batch::{BatchJobManager, BatchJobSettings, StartJobRequest};
pub use cascade::TextOperationCascade;
pub use document::{
    DocumentTranslationCascade, DocumentTranslationOutcome, DocumentTranslationRequest,
};
pub use realtime::RealtimeTranslator;
pub use routing::{RoutingPolicy, decide_route, estimate_batch_time};
