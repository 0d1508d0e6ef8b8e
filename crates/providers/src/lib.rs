//! Language model implementations for ProdOps.
//!
//! All models implement the `prodops_core::LanguageModel` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatModel;
