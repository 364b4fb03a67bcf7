//! One-shot provider resolution from configuration and credentials.

use anyhow::bail;
use sibyl_llm::{AnyProvider, ClaudeProvider, OpenAiProvider};

use crate::config::{Config, ProviderKind};
use crate::secrets::ResolvedSecrets;

/// Pick the chat provider once at startup. `auto` prefers OpenAI because
/// only it serves embeddings; an explicit provider must have its own key.
///
/// # Errors
///
/// Returns an error when the selected provider has no credential.
pub fn resolve_provider(
    config: &Config,
    secrets: &ResolvedSecrets,
) -> anyhow::Result<AnyProvider> {
    let openai = |key: &crate::secrets::Secret| {
        AnyProvider::OpenAi(OpenAiProvider::new(
            key.expose().to_owned(),
            config.llm.openai_base_url.clone(),
            config.llm.openai_model.clone(),
            config.llm.max_tokens,
            config.llm.temperature,
            Some(config.llm.embedding_model.clone()),
        ))
    };
    let claude = |key: &crate::secrets::Secret| {
        AnyProvider::Claude(ClaudeProvider::new(
            key.expose().to_owned(),
            config.llm.claude_base_url.clone(),
            config.llm.claude_model.clone(),
            config.llm.max_tokens,
            config.llm.temperature,
        ))
    };

    match config.llm.provider {
        ProviderKind::OpenAi => match &secrets.openai_api_key {
            Some(key) => Ok(openai(key)),
            None => bail!("OPENAI_API_KEY is required for the openai provider"),
        },
        ProviderKind::Claude => match &secrets.anthropic_api_key {
            Some(key) => Ok(claude(key)),
            None => bail!("ANTHROPIC_API_KEY is required for the claude provider"),
        },
        ProviderKind::Auto => {
            if let Some(key) = &secrets.openai_api_key {
                Ok(openai(key))
            } else if let Some(key) = &secrets.anthropic_api_key {
                Ok(claude(key))
            } else {
                bail!("No API key found. Please set OPENAI_API_KEY or ANTHROPIC_API_KEY")
            }
        }
    }
}
