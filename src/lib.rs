//! notegen: client-side orchestration for outline-to-image generation.
//!
//! A topic becomes an outline of typed pages; every page becomes one generated
//! image delivered over a single streamed request, with per-page retries and
//! a durable snapshot of the active task.

pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod orchestrator;
pub mod service;
pub mod store;
pub mod stream;
pub mod types;
