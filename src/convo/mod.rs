//! Conversation core: per-call state machine, intent policy, session registry.

pub mod engine;
pub mod intent;
pub mod prompts;
pub mod registry;
pub mod session;

pub use engine::{ConversationEngine, TurnAction, TurnDirective};
pub use intent::{Intent, classify};
pub use registry::SessionRegistry;
pub use session::{ConversationSession, Mode};
