//! Test doubles and environment helpers for exercising the engine without any external services.
pub mod fakes;
#[cfg(feature = "sqlite")]
pub mod prepare_env;
