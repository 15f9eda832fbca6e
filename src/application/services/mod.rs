//! Application services

pub mod client;
pub mod session;
pub mod transport;

pub use client::CloudlandClient;
pub use session::{SessionService, SessionStore};
pub use transport::Transport;
