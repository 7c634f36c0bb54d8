pub mod config;
pub mod enrich;
pub mod ledger;
pub mod llm;
pub mod logging;
pub mod normalize;
pub mod prompt;
pub mod render;
pub mod rss;
pub mod sanitize;
pub mod store;
pub mod types;

use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_STORE: &str = "store";

#[derive(Clone, Debug)]
pub enum LLMClient {
    Ollama(Ollama),
    OpenAI(OpenAIClient<OpenAIConfig>),
}

#[derive(Clone)]
pub struct LLMParams {
    pub llm_client: LLMClient,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}
