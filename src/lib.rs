//! SourceLens: LLM-assisted analysis of historical primary sources
//!
//! The crate has two halves sharing one data model:
//! - [`api`] and [`service`]: the HTTP service that builds prompts and calls the
//!   hosted LLM providers.
//! - [`client`]: the researcher-side orchestration that decides when to request an
//!   analysis, falls back between endpoints, and reports progress.

pub mod api;
pub mod app;
pub mod client;
pub mod model;
pub mod service;
