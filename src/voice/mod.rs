//! Telephony transport adapter: TwiML rendering, Twilio REST, webhook routes.

pub mod routes;
pub mod twilio;
pub mod twiml;

pub use routes::{AppState, voice_routes};
pub use twilio::TwilioClient;
pub use twiml::VoiceResponse;
