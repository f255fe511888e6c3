//! Answer generation: prompt construction around a [`CompletionModel`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::llm::{CompletionModel, CompletionRequest};

/// Placeholder in [`PERSONA_TEMPLATE`] replaced by the formatted context.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// System prompt of the tourism assistant.
///
/// The model is told to ground answers in the supplied documents when they
/// are relevant, to fall back to general knowledge of Meghalaya otherwise,
/// and never to invent specific facts such as dates or prices.
pub const PERSONA_TEMPLATE: &str = "\
You are a knowledgeable and friendly Meghalaya Tourism Bot, designed to provide comprehensive, \
accurate, and helpful travel-related information about Meghalaya, India.

Your role is to:
- Provide detailed information about Meghalaya's attractions, culture, festivals, and travel tips
- Help users plan their trips with practical advice on accommodation, transportation, and activities
- Share insights about local customs, traditions, and cultural experiences
- Offer recommendations based on user preferences and interests

Key areas of expertise:
- Natural attractions: Living Root Bridges, Cherrapunji, Mawsynram, Shillong, etc.
- Cultural heritage: Khasi, Garo, and Jaintia traditions
- Festivals: Nongkrem, Wangala, Behdienkhlam, etc.
- Adventure activities: Trekking, caving, river rafting
- Local cuisine, accommodation, transportation and seasonal considerations

Rules for using the context below:
1. When the context documents are relevant, answer using only the information they contain.
2. When the context is insufficient, say so and fall back to general knowledge of Meghalaya tourism.
3. Never state specific facts such as dates, prices, timings or phone numbers unless they appear \
in the context or are well-established general knowledge. If unsure, say so and suggest where \
the user might find current information.

Always be culturally sensitive and respectful, and specific with recommendations.

Context from tourism documents:
{context}

Please provide a helpful and informative response about Meghalaya tourism based on the user's \
question and the context provided above.";

/// Outcome of one generation attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationResult {
    /// The answer, or an apology when generation failed. Never empty.
    pub text: String,
    /// Whether the completion service produced the answer.
    pub success: bool,
    /// Raw error string on failure.
    pub error: Option<String>,
}

impl GenerationResult {
    /// A failed result carrying an apology that embeds `detail`.
    pub fn failure(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            text: format!(
                "I apologize, but I encountered an error while generating a response: {detail}"
            ),
            success: false,
            error: Some(detail),
        }
    }
}

/// Sampling settings passed with every completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationSettings {
    /// Model id.
    pub model: String,
    /// Sampling temperature in `[0, 2]`.
    pub temperature: f32,
    /// Completion length limit, greater than zero.
    pub max_tokens: u32,
}

impl GenerationSettings {
    /// Validate and create settings.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if `temperature` is outside
    /// `[0, 2]`, `max_tokens` is zero, or `model` is empty.
    pub fn new(model: impl Into<String>, temperature: f32, max_tokens: u32) -> Result<Self> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(RagError::Configuration("generation model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&temperature) {
            return Err(RagError::Configuration(format!(
                "temperature ({temperature}) must be between 0 and 2"
            )));
        }
        if max_tokens == 0 {
            return Err(RagError::Configuration("max_tokens must be greater than zero".into()));
        }
        Ok(Self { model, temperature, max_tokens })
    }
}

impl TryFrom<&RagConfig> for GenerationSettings {
    type Error = RagError;

    fn try_from(config: &RagConfig) -> Result<Self> {
        Self::new(config.generation_model.clone(), config.temperature, config.max_tokens)
    }
}

/// Builds the persona prompt and calls the completion service.
///
/// [`generate`](AnswerGenerator::generate) never fails: upstream errors become
/// a [`GenerationResult`] with `success == false` and an apology text.
pub struct AnswerGenerator {
    model: Arc<dyn CompletionModel>,
    settings: GenerationSettings,
}

impl AnswerGenerator {
    /// Create a generator.
    pub fn new(model: Arc<dyn CompletionModel>, settings: GenerationSettings) -> Self {
        Self { model, settings }
    }

    /// The system prompt with `context` substituted.
    pub fn system_prompt(context: &str) -> String {
        PERSONA_TEMPLATE.replacen(CONTEXT_PLACEHOLDER, context, 1)
    }

    /// The request sent for `question` with `context`.
    pub fn build_request(&self, question: &str, context: &str) -> CompletionRequest {
        CompletionRequest {
            system_prompt: Self::system_prompt(context),
            user_prompt: question.to_string(),
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }

    /// Generate an answer to `question` grounded in `context`.
    pub async fn generate(&self, question: &str, context: &str) -> GenerationResult {
        let request = self.build_request(question, context);
        debug!(
            provider = self.model.name(),
            model = %request.model,
            system_prompt_len = request.system_prompt.len(),
            "requesting completion"
        );

        match self.model.complete(&request).await {
            Ok(text) if !text.trim().is_empty() => {
                GenerationResult { text, success: true, error: None }
            }
            Ok(_) => {
                error!(provider = self.model.name(), "completion service returned an empty answer");
                GenerationResult::failure("the completion service returned an empty answer")
            }
            Err(e) => {
                error!(provider = self.model.name(), error = %e, "generation failed");
                GenerationResult::failure(e.to_string())
            }
        }
    }
}
