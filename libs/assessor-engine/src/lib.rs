pub mod analytics;
pub mod cancel;
pub mod codec;
pub mod config;
pub mod engine;
pub mod evaluator;
pub mod executor;
pub mod extractor;
pub mod harness;

#[cfg(test)]
mod executor_tests;
