//! `genai-client`: blocking driver for the Gemini `generateContent` endpoint.
//!
//! The `aipm` workspace only ever needs "send a prompt, get text back", so this
//! crate stays deliberately small:
//!
//! ```text
//! GeminiClient::new(api_key, model)
//!     │
//!     ▼
//! POST {base_url}/models/{model}:generateContent
//!     │   body: GenerateRequest { contents: [ { parts: [ { text } ] } ] }
//!     ▼
//! GenerateResponse  ← candidates[0].content.parts[*].text, joined
//! ```
//!
//! Retrying is the caller's job; a single `generate` call makes exactly one
//! request.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use genai_client::GeminiClient;
//!
//! let client = GeminiClient::new(std::env::var("GEMINI_API_KEY")?, "gemini-2.5-pro")?;
//! let text = client.generate("Summarize the PRD below ...")?;
//! ```

pub mod client;
pub mod error;
pub mod types;


pub use client::{GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::GenAiError;
pub use types::{Candidate, Content, GenerateRequest, GenerateResponse, Part};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, GenAiError>;
