use std::future::Future;

use anyhow::{Context, Result};
use rig::client::completion::CompletionClientDyn;
use rig::client::{ProviderClient, ProviderValue};
use rig::completion::Prompt;
use rig::providers::{anthropic, gemini, groq, mistral, ollama, openai};

use crate::config::LlmConfig;

/// External text-generation service: prompt in, free-form text out.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

fn create_provider_boxed(provider: &str, api_key: &str) -> Result<Box<dyn ProviderClient>> {
    let value = ProviderValue::Simple(api_key.to_string());

    let boxed: Box<dyn ProviderClient> = match provider.to_lowercase().as_str() {
        "gemini" | "google" => {
            let c: gemini::Client<reqwest::Client> = gemini::Client::from_val(value);
            c.boxed()
        }
        "openai" => {
            let c: openai::Client<reqwest::Client> = openai::Client::from_val(value);
            c.boxed()
        }
        "anthropic" => {
            let c: anthropic::Client<reqwest::Client> = anthropic::Client::from_val(value);
            c.boxed()
        }
        "groq" => {
            let c: groq::Client<reqwest::Client> = groq::Client::from_val(value);
            c.boxed()
        }
        "mistral" => {
            let c: mistral::Client<reqwest::Client> = mistral::Client::from_val(value);
            c.boxed()
        }
        "ollama" => {
            let c: ollama::Client<reqwest::Client> = ollama::Client::from_val(value);
            c.boxed()
        }
        other => return Err(anyhow::anyhow!("Unsupported provider: {other}")),
    };

    Ok(boxed)
}

pub fn create_completion_client(
    provider: &str,
    api_key: &str,
) -> Result<Box<dyn CompletionClientDyn>> {
    let boxed = create_provider_boxed(provider, api_key)?;
    boxed
        .as_completion()
        .context(format!("Provider '{provider}' does not support completions"))
}

/// `TextGenerator` backed by a rig completion agent.
#[derive(Clone)]
pub struct RigGenerator {
    provider: String,
    model: String,
    api_key: String,
    preamble: String,
}

impl RigGenerator {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        // fail fast on unknown providers instead of on the first prompt
        create_completion_client(&config.provider, &api_key)?;

        Ok(Self {
            provider: config.provider.clone(),
            model: config.model.clone(),
            api_key,
            preamble: config.system_prompt.clone(),
        })
    }
}

impl TextGenerator for RigGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let completion_client = create_completion_client(&self.provider, &self.api_key)?;

        let agent = completion_client
            .agent(&self.model)
            .preamble(&self.preamble)
            .build();

        tracing::debug!(
            "Sending {} char prompt to {}/{}",
            prompt.len(),
            self.provider,
            self.model
        );

        agent
            .prompt(prompt.to_string())
            .await
            .map_err(|e| anyhow::anyhow!("LLM error: {e}"))
    }
}
