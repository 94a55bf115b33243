//! Discord surface: slash commands, interactive components and the
//! gateway event handler.

pub mod bot;
pub mod commands;
pub mod components;
pub mod handler;

pub use bot::{build_client, BotState};
