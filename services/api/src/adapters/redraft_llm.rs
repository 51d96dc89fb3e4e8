//! services/api/src/adapters/redraft_llm.rs
//!
//! This module contains the adapter for the redrafting LLM.
//! It implements the `RedraftService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::{future, StreamExt};
use redraft_core::domain::{RedraftRequest, TechnicalTier};
use redraft_core::ports::{PortError, PortResult, RedraftService, RedraftStream};

//=========================================================================================
// Prompt Constants
//=========================================================================================

const ROLE_STATEMENT: &str = "You are an expert email communication coach. Your task is to redraft emails based on the specific instructions provided by the user.";

const DEFAULT_CONTEXT: &str = "General business correspondence";

const GUIDELINES: &str = r#"Guidelines:
- Follow the user's instructions precisely
- Maintain the core message and intent of the original email
- Ensure the redrafted email is professional and well-structured
- Only provide the redrafted email - no analysis, scores, or explanations
- Consider the recipient's technical knowledge level when choosing language and explanations"#;

const BILINGUAL_GUIDELINES: &str = r###"Guidelines:
- Follow the user's instructions precisely
- Maintain the core message and intent of the original email
- Ensure the redrafted email is professional and well-structured
- Provide the redrafted email in two clearly headed sections: first a section headed "## English Version", then a section headed "## Spanish Version" containing a faithful Spanish rendition of the same email
- Do not add any analysis, scores, or explanations outside those two sections
- Consider the recipient's technical knowledge level when choosing language and explanations"###;

//=========================================================================================
// Prompt Composition
//=========================================================================================

/// Describes the recipient's technical fluency for the system prompt.
fn technical_guidance(name: &str, level: i32) -> String {
    match TechnicalTier::from_level(level) {
        TechnicalTier::Beginner => format!(
            "The recipient ({}) has beginner-level technical knowledge. Use simple, \
             non-technical language and provide step-by-step explanations. Avoid jargon \
             and technical acronyms.",
            name
        ),
        TechnicalTier::Intermediate => format!(
            "The recipient ({}) has intermediate technical knowledge. You can use some \
             technical terms but provide brief explanations when needed.",
            name
        ),
        TechnicalTier::Advanced => format!(
            "The recipient ({}) has advanced technical knowledge. You can use technical \
             language and assume familiarity with complex concepts.",
            name
        ),
    }
}

/// Composes the single system instruction sent with every redraft request.
pub fn build_system_prompt(request: &RedraftRequest) -> String {
    let context = request
        .context
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CONTEXT);

    let mut prompt = format!("{}\n\nContext: {}\n\n", ROLE_STATEMENT, context);

    if let Some(client) = &request.client {
        prompt.push_str(&format!(
            "Recipient Technical Level: {}\n\n",
            technical_guidance(&client.name, client.technical_knowledge)
        ));
    }

    prompt.push_str(&format!("User Instructions: {}\n\n", request.prompt));
    prompt.push_str(if request.bilingual_output {
        BILINGUAL_GUIDELINES
    } else {
        GUIDELINES
    });

    prompt
}

/// Composes the single user turn carrying the original email.
pub fn build_user_message(original_email: &str) -> String {
    format!(
        "Please redraft this email based on the instructions provided:\n\n\
         Original Email:\n\"\"\"\n{}\n\"\"\"\n\n\
         Provide only the redrafted email.",
        original_email
    )
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `RedraftService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiRedraftAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiRedraftAdapter {
    /// Creates a new `OpenAiRedraftAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `RedraftService` Trait Implementation
//=========================================================================================

#[async_trait]
impl RedraftService for OpenAiRedraftAdapter {
    /// Sends the composed prompt upstream and forwards the model's output
    /// as a stream of incremental text chunks.
    async fn redraft_stream(&self, request: &RedraftRequest) -> PortResult<RedraftStream> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(build_system_prompt(request))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_user_message(&request.original_email))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let api_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .stream(true)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // A rejection here (bad credentials, quota, network) surfaces before
        // any chunk is produced; mid-stream failures arrive as `Err` items.
        let upstream = self
            .client
            .chat()
            .create_stream(api_request)
            .await
            .map_err(|e: OpenAIError| PortError::Upstream(e.to_string()))?;

        let chunks = upstream
            .map(|item| match item {
                Ok(response) => Ok(response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
                    .unwrap_or_default()),
                Err(e) => Err(PortError::Upstream(e.to_string())),
            })
            .filter(|chunk| future::ready(!matches!(chunk, Ok(text) if text.is_empty())));

        Ok(Box::pin(chunks))
    }
}

//=========================================================================================
// Tests
//=========================================================================================
