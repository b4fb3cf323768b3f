// Public API for integration tests and potential library usage

pub mod api;
pub mod auth;
pub mod llm;
pub mod protocol;
pub mod server;
pub mod state;
pub mod store;
pub mod types;
pub mod usernames;
pub mod ws;
