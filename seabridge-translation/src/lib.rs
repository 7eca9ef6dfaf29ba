//! SeaBridge 翻译服务
//!
//! - 路由决策：实时（短文本）或批处理（大文件、结构化文档）
//! - 文本操作级联：主模型失败时切换备用模型
//! - 批处理作业：对象存储暂存、状态轮询、签名下载链接

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod service;

pub use application::{
    JobPoller, JobWatch, PollOutcome, StartTranslationJobCommand, TranslateDocumentCommand,
    TranslateTextCommand, TranslationApplicationService,
};
pub use domain::model::{
    ContentCharacteristics, JobStatus, ProviderTagged, RealtimeTranslation, StartJobResponse,
    TranslationJob, TranslationMethod, TranslationRoute,
};
pub use domain::repository::{
    BatchTranslationProvider, MessageMetadataReader, ObjectStorage, TextGenerator,
    TranslationJobStore,
};
pub use domain::service::decide_route;
