//! Hyprland-specific implementations.
//!
//! This module provides the concrete backend for the
//! [`Desktop`](crate::traits::Desktop) trait, powered by Hyprland's IPC
//! socket.
//!
//! Nothing outside this module should reference Hyprland directly.

pub mod desktop;

pub use desktop::{HyprlandDesktop, HyprlandError};
