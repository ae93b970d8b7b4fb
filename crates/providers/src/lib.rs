//! Completion backends for taskloom.
//!
//! All providers implement the `taskloom_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
