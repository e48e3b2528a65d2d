//! Munin - Resilient LLM gateway for clinical-document pipelines
//!
//! This crate is the shared client layer a clinical-document backend uses
//! to talk to hosted LLM providers. Every rule engine, extractor, and
//! judge calls one entry point — [`Gateway::generate`] — and gets bounded
//! concurrency, wall-clock deadline budgets across retries, jittered
//! exponential backoff with server-supplied overrides, content-addressed
//! response caching, and a dual-protocol provider abstraction with
//! per-model capability filtering, without carrying any of that logic
//! itself.
//!
//! # Example
//!
//! ```rust,no_run
//! use munin::{GenerateOptions, Munin};
//!
//! #[tokio::main]
//! async fn main() -> munin::Result<()> {
//!     let gateway = Munin::builder()
//!         .openai("sk-your-key")
//!         .default_model("gpt-4o-mini")
//!         .build()?;
//!
//!     let response = gateway
//!         .generate(
//!             "Extract the procedure codes from this note: ...",
//!             &GenerateOptions::default()
//!                 .task("extraction")
//!                 .prompt_version("v3"),
//!         )
//!         .await?;
//!
//!     println!("{}", response.text);
//!     Ok(())
//! }
//! ```
//!
//! # Offline mode
//!
//! ```rust
//! use munin::{GenerateOptions, Munin};
//!
//! # #[tokio::main]
//! # async fn main() -> munin::Result<()> {
//! let gateway = Munin::builder().offline(r#"{"codes":[]}"#).build()?;
//! let response = gateway
//!     .generate("anything", &GenerateOptions::default().model("any"))
//!     .await?;
//! assert_eq!(response.text, r#"{"codes":[]}"#);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod providers;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod usage;

// Re-export main types at crate root
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, Munin, MuninBuilder};
pub use traits::ModelGateway;

// Re-export all types
pub use config::{GatewayConfig, ProviderKind};
pub use types::{GenerateOptions, GenerateRequest, GenerateResponse, Protocol, Usage};
pub use usage::{ModelPrice, ModelTotals, PriceTable, UsageSummary};
