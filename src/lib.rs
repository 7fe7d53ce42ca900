//! **ctxswitch**: named window layouts, restored on demand.
//!
//! A *workspace* is a named list of window patterns.  Switching to it shows
//! the apps it names, hides every other app, raises the windows it selects
//! and minimizes the ones it does not.  Switches are triggered from a
//! Unix-socket command interface or from a global keyboard shortcut.
//!
//! # Architecture
//!
//! The crate is organised around three core traits:
//!
//! * [`traits::Desktop`]: abstracts process and window control so the
//!   switch logic is not coupled to any specific desktop.
//! * [`traits::KeyHook`]: abstracts global keyboard interception so the
//!   shortcut dispatcher is not coupled to any specific input facility.
//! * [`traits::CommandSource`]: abstracts the transport that delivers
//!   user intent so the main loop is not coupled to any specific IPC
//!   mechanism.
//!
//! Concrete implementations live in [`hyprland`] (Hyprland IPC) and
//! [`ipc`] (Unix-socket command listener and key hook).  All state changes
//! go through [`store::WorkspaceStore`] and are applied by
//! [`switcher::WorkspaceSwitcher`] on a single thread.

pub mod capture;
pub mod command;
pub mod config;
pub mod hotkey;
pub mod hyprland;
pub mod ipc;
pub mod shortcut;
pub mod store;
pub mod switcher;
pub mod title;
pub mod traits;
pub mod workspace;

#[cfg(test)]
mod testing;
