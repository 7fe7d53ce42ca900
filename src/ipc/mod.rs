//! Unix-socket transports.
//!
//! External tools (scripts, launcher menus, etc.) connect to the command
//! socket and send newline-delimited JSON commands.  A key-forwarding helper
//! connects to the key socket and asks, event by event, whether a key-down
//! should be swallowed.

pub mod keys;
pub mod listener;

pub use keys::SocketKeyHook;
pub use listener::{UnixSocketError, UnixSocketListener};
