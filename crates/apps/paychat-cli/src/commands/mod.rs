//! CLI command implementations.

pub mod balance;
pub mod chat;
pub mod fetch;
pub mod init;
pub mod send;

// Re-export command handlers
pub use balance::balance;
pub use chat::chat;
pub use fetch::fetch;
pub use init::init;
pub use send::send;
