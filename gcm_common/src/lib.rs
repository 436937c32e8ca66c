mod cents;
pub mod helpers;

pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError, USD_CURRENCY_CODE};
pub use secret::Secret;
