//! Voice Assist: voice-driven email assistant core.

pub mod config;
pub mod convo;
pub mod error;
pub mod llm;
pub mod mailbox;
pub mod voice;
