//! Bindings between the engine's collaborator traits and the third-party services the marketplace uses.
//!
//! * [`coingate`]: CoinGate hosts the payment sessions and sends the payment callbacks.
//! * [`tango`]: Tango Card issues the gift cards.
//! * [`mailer`]: codes are emailed to the buyer through an HTTP mail relay.
pub mod coingate;
pub mod mailer;
pub mod tango;

pub use coingate::CoinGateGateway;
pub use mailer::MailRelayNotifier;
pub use tango::TangoProvider;
