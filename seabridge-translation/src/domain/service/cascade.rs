//! 文本操作级联
//!
//! 按顺序尝试供应商（主 -> 备），每个供应商每次请求最多调用一次。
//! 结果标记实际产出的供应商；全部失败时返回 `Unavailable`，不会静默返回空结果。

use std::sync::Arc;

use serde_json::json;

use seabridge_core::{Result, SeaBridgeError, TranslationMetrics};

use crate::domain::model::{
    GeneratedOutput, OperationOutput, ProviderTagged, RealtimeTranslation, TextOperation,
};
use crate::domain::repository::{TextGenerator, TextGeneratorRef};
use crate::domain::service::realtime::{parse_translation, translation_prompt, translation_schema};

pub struct TextOperationCascade {
    providers: Vec<TextGeneratorRef>,
    metrics: Option<Arc<TranslationMetrics>>,
}

impl TextOperationCascade {
    pub fn new(primary: TextGeneratorRef, fallback: TextGeneratorRef) -> Self {
        Self::with_providers(vec![primary, fallback])
    }

    pub fn with_providers(providers: Vec<TextGeneratorRef>) -> Self {
        Self {
            providers,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<TranslationMetrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub async fn run(
        &self,
        operation: &TextOperation,
        input: &str,
    ) -> Result<ProviderTagged<OperationOutput>> {
        if input.trim().is_empty() {
            return Ok(ProviderTagged {
                value: empty_output(operation),
                provider: self
                    .providers
                    .first()
                    .map(|p| p.provider_name().to_string())
                    .unwrap_or_default(),
                fell_back: false,
            });
        }

        let mut last_error: Option<SeaBridgeError> = None;
        for (index, provider) in self.providers.iter().enumerate() {
            if index > 0 {
                if let Some(metrics) = &self.metrics {
                    metrics
                        .cascade_fallbacks
                        .with_label_values(&[operation.name()])
                        .inc();
                }
            }

            match attempt(provider.as_ref(), operation, input).await {
                Ok(value) => {
                    return Ok(ProviderTagged {
                        value,
                        provider: provider.provider_name().to_string(),
                        fell_back: index > 0,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        provider = provider.provider_name(),
                        operation = operation.name(),
                        error = %err,
                        "Text operation stage failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        let message = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no providers configured".to_string());
        Err(SeaBridgeError::unavailable(operation.display_name(), message))
    }

    pub async fn simplify(&self, text: &str) -> Result<ProviderTagged<String>> {
        let tagged = self.run(&TextOperation::Simplify, text).await?;
        map_tagged(tagged, |output| match output {
            OperationOutput::Text(text) => Some(text),
            _ => None,
        })
    }

    pub async fn summarize(&self, text: &str) -> Result<ProviderTagged<String>> {
        let tagged = self.run(&TextOperation::Summarize, text).await?;
        map_tagged(tagged, |output| match output {
            OperationOutput::Text(text) => Some(text),
            _ => None,
        })
    }

    pub async fn chunk(&self, text: &str) -> Result<ProviderTagged<Vec<String>>> {
        let tagged = self.run(&TextOperation::Chunk, text).await?;
        map_tagged(tagged, |output| match output {
            OperationOutput::Chunks(chunks) => Some(chunks),
            _ => None,
        })
    }

    pub async fn translate(
        &self,
        text: &str,
        target_language: &str,
        source_language: Option<&str>,
    ) -> Result<ProviderTagged<RealtimeTranslation>> {
        let operation = TextOperation::Translate {
            target_language: target_language.to_string(),
            source_language: source_language.map(str::to_string),
        };
        let tagged = self.run(&operation, text).await?;
        map_tagged(tagged, |output| match output {
            OperationOutput::Translation(translation) => Some(translation),
            _ => None,
        })
    }
}

async fn attempt(
    provider: &dyn TextGenerator,
    operation: &TextOperation,
    input: &str,
) -> Result<OperationOutput> {
    let name = provider.provider_name();
    match operation {
        TextOperation::Simplify => {
            let prompt = format!(
                "Rewrite the following text in plain, simple language that a parent can \
                 read quickly. Keep every date, time and action item.\n\n{}",
                input
            );
            let output = provider.generate(&prompt, None).await?;
            non_empty_text(name, output).map(OperationOutput::Text)
        }
        TextOperation::Summarize => {
            let prompt = format!(
                "Summarize the following text in a few sentences. Keep every date, time \
                 and action item.\n\n{}",
                input
            );
            let output = provider.generate(&prompt, None).await?;
            non_empty_text(name, output).map(OperationOutput::Text)
        }
        TextOperation::Chunk => {
            let prompt = format!(
                "Split the following text into self-contained sections. Respond with a JSON \
                 array of strings.\n\n{}",
                input
            );
            let schema = json!({ "type": "array", "items": { "type": "string" } });
            let output = provider.generate(&prompt, Some(&schema)).await?;
            let chunks = parse_chunks(output);
            if chunks.is_empty() {
                return Err(SeaBridgeError::provider(name, "chunking returned no sections"));
            }
            Ok(OperationOutput::Chunks(chunks))
        }
        TextOperation::Translate {
            target_language,
            source_language,
        } => {
            let prompt = translation_prompt(input, target_language, source_language.as_deref());
            let output = provider
                .generate(&prompt, Some(&translation_schema()))
                .await?;
            parse_translation(name, output, source_language.as_deref())
                .map(OperationOutput::Translation)
        }
    }
}

fn empty_output(operation: &TextOperation) -> OperationOutput {
    match operation {
        TextOperation::Simplify | TextOperation::Summarize => OperationOutput::Text(String::new()),
        TextOperation::Chunk => OperationOutput::Chunks(Vec::new()),
        TextOperation::Translate {
            source_language, ..
        } => OperationOutput::Translation(RealtimeTranslation {
            translated_text: String::new(),
            source_language_detected: source_language.clone(),
        }),
    }
}

fn non_empty_text(provider: &str, output: GeneratedOutput) -> Result<String> {
    let text = match output {
        GeneratedOutput::Text(text) => text,
        GeneratedOutput::Structured(value) => match value {
            serde_json::Value::String(text) => text,
            other => other
                .get("text")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_default(),
        },
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SeaBridgeError::provider(provider, "empty response"));
    }
    Ok(trimmed.to_string())
}

/// 解析分段结果：结构化 JSON 字符串数组，或以空行分隔的纯文本
fn parse_chunks(output: GeneratedOutput) -> Vec<String> {
    let chunks: Vec<String> = match output {
        GeneratedOutput::Structured(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        GeneratedOutput::Structured(_) => Vec::new(),
        GeneratedOutput::Text(text) => text.split("\n\n").map(str::to_string).collect(),
    };
    chunks
        .into_iter()
        .map(|chunk| chunk.trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

fn map_tagged<T>(
    tagged: ProviderTagged<OperationOutput>,
    extract: impl FnOnce(OperationOutput) -> Option<T>,
) -> Result<ProviderTagged<T>> {
    let ProviderTagged {
        value,
        provider,
        fell_back,
    } = tagged;
    let value = extract(value).ok_or_else(|| {
        SeaBridgeError::Other(anyhow::anyhow!("operation produced an unexpected output kind"))
    })?;
    Ok(ProviderTagged {
        value,
        provider,
        fell_back,
    })
}
