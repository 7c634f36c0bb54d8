//! The single suspension point of the pipeline: calls to the external
//! analysis model, with timeout and retry.

use anyhow::{anyhow, Result};
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

const LLM_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_RETRIES: usize = 3;

/// Analysis collaborator seam. The pipeline only ever sees
/// `analyze(prompt) -> Option<text>`; tests substitute scripted replies.
pub trait Analyzer {
    fn analyze(&self, prompt: &str) -> impl std::future::Future<Output = Option<String>> + Send;
}

/// Production analyzer backed by an Ollama or OpenAI-compatible endpoint.
pub struct LlmAnalyzer {
    params: LLMParams,
}

impl LlmAnalyzer {
    pub fn new(params: LLMParams) -> Self {
        Self { params }
    }
}

impl Analyzer for LlmAnalyzer {
    async fn analyze(&self, prompt: &str) -> Option<String> {
        generate_llm_response(prompt, &self.params).await
    }
}

/// Sends one prompt, retrying transient failures with exponential backoff.
/// Returns `None` when every attempt fails; the caller records a failed
/// enrichment attempt and moves on.
pub async fn generate_llm_response(prompt: &str, params: &LLMParams) -> Option<String> {
    let mut backoff = 2;

    for retry_count in 0..MAX_RETRIES {
        debug!(
            target: TARGET_LLM_REQUEST,
            "Sending analysis request ({} chars) to model {}",
            prompt.chars().count(),
            params.model
        );

        match request_once(prompt, params).await {
            Ok(response) if !response.trim().is_empty() => {
                debug!(target: TARGET_LLM_REQUEST, "Analysis response received");
                return Some(response);
            }
            Ok(_) => {
                warn!(target: TARGET_LLM_REQUEST, "Empty analysis response from model {}", params.model);
            }
            Err(err) => {
                warn!(target: TARGET_LLM_REQUEST, "Analysis request failed: {}", err);
            }
        }

        if retry_count < MAX_RETRIES - 1 {
            debug!(target: TARGET_LLM_REQUEST, "Backing off for {} seconds before retry", backoff);
            sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }

    error!(
        target: TARGET_LLM_REQUEST,
        "No analysis response after {} retries", MAX_RETRIES
    );
    None
}

async fn request_once(prompt: &str, params: &LLMParams) -> Result<String> {
    match &params.llm_client {
        LLMClient::Ollama(ollama) => {
            let mut request = GenerationRequest::new(params.model.clone(), prompt.to_string());
            request.options = Some(GenerationOptions::default().temperature(params.temperature));

            let response = timeout(LLM_TIMEOUT, ollama.generate(request))
                .await
                .map_err(|_| anyhow!("ollama request timed out"))?
                .map_err(|err| anyhow!("ollama error: {}", err))?;
            Ok(response.response)
        }
        LLMClient::OpenAI(client) => {
            let request = CreateChatCompletionRequestArgs::default()
                .model(&params.model)
                .temperature(params.temperature)
                .max_tokens(params.max_tokens)
                .messages([ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into()])
                .build()?;

            let response = timeout(LLM_TIMEOUT, client.chat().create(request))
                .await
                .map_err(|_| anyhow!("chat completion timed out"))??;

            response
                .choices
                .first()
                .and_then(|choice| choice.message.content.clone())
                .ok_or_else(|| anyhow!("chat completion carried no content"))
        }
    }
}
