//! Image generation backends for the kinetic asset pipeline.
//!
//! Provides the provider contracts ([`ImageProvider`],
//! [`BackgroundRemover`]), HTTP adapters for the general text-to-image
//! service, the identity-preserving avatar service and the
//! background-removal model, the role-based [`ProviderRouter`], and the
//! bounded [`retry`] policies wrapped around every call.

pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod imaging;
pub mod provider;
pub mod retry;
pub mod rmbg;
pub mod router;
pub mod together;

pub use config::ProviderConfig;
pub use error::GenerationError;
pub use provider::{BackgroundRemover, ImageProvider};
pub use retry::{with_retry, RetryExhausted, RetryPolicy, RetryWait, Sleeper, TokioSleeper};
pub use router::ProviderRouter;
