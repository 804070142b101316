//! Azure OpenAI chat completions provider.

pub mod client;
pub mod types;

pub use client::{AzureOpenAIConfig, AzureOpenAIProvider};
