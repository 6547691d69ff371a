pub mod client;

pub use client::{OpenAiProvider, ProviderError, TextProvider, TextRequest};
