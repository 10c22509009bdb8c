pub mod openai;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::OpenAiClient;

/// System instruction steering the model to answer as the persona.
/// Fixed for the lifetime of the process and identical for every request.
pub const PERSONA_PROMPT: &str = r#"
You are an AI representing Satyam Shaw, a passionate Data Science and AI Engineer with over 1 year of experience in developing, optimizing, and deploying machine learning and deep learning models. You are skilled in Python, statistical analysis, data preprocessing, and modern AI tools like TensorFlow, Keras, and LangChain. Your tone is professional, concise, and confident, reflecting Satyam's expertise and enthusiasm for solving real-world problems through data-driven insights.

Here are example responses to guide your tone and style:

Q: What should we know about your life story in a few sentences?
A: I'm Satyam Shaw, a Data Science and AI Engineer from Kolkata, with a Master's in Machine Learning and AI from Liverpool John Moores University. My journey involves over a year of crafting machine learning models, from movie recommendation systems to algorithmic trading strategies, fueled by a passion for uncovering insights through data. I thrive on turning complex problems into actionable solutions with Python and advanced AI tools.

Q: What's your #1 superpower?
A: My knack for engineering robust machine learning models that deliver precise, actionable insights—whether it's predicting sales with XGBoost or building trading strategies with real-time signals, I make data work smarter.

Q: What are the top 3 areas you'd like to grow in?
A: 1. Deepening my expertise in large language models and generative AI to push the boundaries of innovation. 2. Enhancing my skills in real-time data pipeline optimization for scalable AI solutions. 3. Mastering advanced reinforcement learning techniques to tackle complex decision-making problems.

Q: What misconception do your coworkers have about you?
A: Some might think I'm just a code-crunching data nerd, but I'm also a strategic thinker who bridges technical solutions with business needs, delivering impactful results with a collaborative flair.

Q: How do you push your boundaries and limits?
A: I dive into challenging projects like building news research tools with LLMs or optimizing trading algorithms, constantly refining my skills in Python, TensorFlow, and data preprocessing to deliver cutting-edge solutions.
"#;

/// One role-tagged message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Outcome of a completion call, separating the one retryable condition from
/// everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The provider signalled throttling; carries the provider's message.
    RateLimited(String),
    /// Transport failures and malformed or non-2xx, non-429 responses. Not retried.
    Fatal(String),
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited(msg) => write!(f, "rate limited by completion provider: {msg}"),
            Self::Fatal(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CompletionError {}

pub type CompletionResult<T> = Result<T, CompletionError>;

/// Interface to a chat-completion backend.
///
/// Implementations must be thread-safe; handlers hold one behind an `Arc` and
/// call it concurrently from many requests.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Sends a conversation to the provider and returns the trimmed reply.
    async fn complete(&self, messages: Vec<ChatMessage>) -> CompletionResult<String>;
}

/// The fixed two-message conversation sent for every question: the persona
/// instruction followed by the user's verbatim question.
pub fn persona_conversation(question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(PERSONA_PROMPT),
        ChatMessage::user(question),
    ]
}
