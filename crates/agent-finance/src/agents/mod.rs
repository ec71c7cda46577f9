//! Agents: personas, conversational agents and report writers

pub mod chat;
pub mod persona;
pub mod writer;

pub use chat::{ChatAgent, Responder};
pub use persona::{AgentPersona, PersonaSet};
pub use writer::ReportWriter;
