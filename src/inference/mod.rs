//! Document summaries from the external inference endpoint.

mod client;
mod config;

pub use client::{InferenceError, SummaryClient, SummaryRequest};
pub use config::{InferenceConfig, InferenceConfigUpdate, InferenceSettings, ModelCatalog};
