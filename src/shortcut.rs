//! Keyboard shortcuts and the matching rule used by the global dispatcher.
//!
//! Two flag encodings meet here:
//!
//! * [`EventFlags`]: the raw modifier word attached to a hardware key
//!   event.  It carries every flag the host reports (caps lock, numeric
//!   pad, fn, …), most of which are irrelevant to shortcut matching.
//! * [`Modifiers`]: the persisted four-bit set a [`KeyShortcut`] stores
//!   (control, option, shift, command).
//!
//! Matching always masks the event down to the four tracked modifiers first
//! and then requires exact set equality, so `⌃1` does not fire on `⌃⇧1` but
//! still fires with caps lock on.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Virtual key code of the escape key.
pub const KEY_ESCAPE: u16 = 0x35;

bitflags! {
    /// Modifier set stored in a [`KeyShortcut`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        const COMMAND = 0x0100;
        const SHIFT = 0x0200;
        const OPTION = 0x0800;
        const CONTROL = 0x1000;
    }
}

bitflags! {
    /// Raw modifier flags of a key event, as delivered by the input hook.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventFlags: u64 {
        const CAPS_LOCK = 0x0001_0000;
        const SHIFT = 0x0002_0000;
        const CONTROL = 0x0004_0000;
        const ALTERNATE = 0x0008_0000;
        const COMMAND = 0x0010_0000;
        const NUMERIC_PAD = 0x0020_0000;
        const HELP = 0x0040_0000;
        const SECONDARY_FN = 0x0080_0000;
        const NON_COALESCED = 0x0000_0100;
    }
}

impl EventFlags {
    /// The flags that participate in shortcut matching.
    pub const TRACKED: EventFlags = EventFlags::CONTROL
        .union(EventFlags::ALTERNATE)
        .union(EventFlags::SHIFT)
        .union(EventFlags::COMMAND);

    /// Keep the raw word intact, including bits this crate does not name.
    pub fn from_raw(raw: u64) -> Self {
        Self::from_bits_retain(raw)
    }
}

impl Modifiers {
    /// Mask an event's flags down to the tracked modifiers.
    pub fn from_event_flags(flags: EventFlags) -> Self {
        let mut mods = Modifiers::empty();
        if flags.contains(EventFlags::CONTROL) {
            mods |= Modifiers::CONTROL;
        }
        if flags.contains(EventFlags::ALTERNATE) {
            mods |= Modifiers::OPTION;
        }
        if flags.contains(EventFlags::SHIFT) {
            mods |= Modifiers::SHIFT;
        }
        if flags.contains(EventFlags::COMMAND) {
            mods |= Modifiers::COMMAND;
        }
        mods
    }
}

/// A persisted keyboard shortcut: a physical key plus a modifier set.
///
/// Serialized as `{"keyCode": 18, "modifiers": 4096}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyShortcut {
    pub key_code: u16,
    #[serde(with = "modifier_bits")]
    pub modifiers: Modifiers,
}

impl KeyShortcut {
    pub fn new(key_code: u16, modifiers: Modifiers) -> Self {
        Self {
            key_code,
            modifiers,
        }
    }

    /// Build a shortcut from a captured key event.
    pub fn from_event(key_code: u16, flags: EventFlags) -> Self {
        Self::new(key_code, Modifiers::from_event_flags(flags))
    }

    /// Whether at least one modifier is part of the shortcut.
    pub fn has_modifier(&self) -> bool {
        !self.modifiers.is_empty()
    }

    /// Exact-set comparison against an incoming key event.
    ///
    /// Untracked flags on the event (caps lock, fn, …) are ignored; tracked
    /// ones must be exactly the stored set.
    pub fn matches(&self, key_code: u16, flags: EventFlags) -> bool {
        self.key_code == key_code && Modifiers::from_event_flags(flags) == self.modifiers
    }
}

impl fmt::Display for KeyShortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(Modifiers::CONTROL) {
            write!(f, "\u{2303}")?;
        }
        if self.modifiers.contains(Modifiers::OPTION) {
            write!(f, "\u{2325}")?;
        }
        if self.modifiers.contains(Modifiers::SHIFT) {
            write!(f, "\u{21e7}")?;
        }
        if self.modifiers.contains(Modifiers::COMMAND) {
            write!(f, "\u{2318}")?;
        }
        match key_name(self.key_code) {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "Key{}", self.key_code),
        }
    }
}

/// Printable name of a virtual key code (ANSI layout).
pub fn key_name(key_code: u16) -> Option<&'static str> {
    let name = match key_code {
        0x00 => "A",
        0x01 => "S",
        0x02 => "D",
        0x03 => "F",
        0x04 => "H",
        0x05 => "G",
        0x06 => "Z",
        0x07 => "X",
        0x08 => "C",
        0x09 => "V",
        0x0B => "B",
        0x0C => "Q",
        0x0D => "W",
        0x0E => "E",
        0x0F => "R",
        0x10 => "Y",
        0x11 => "T",
        0x12 => "1",
        0x13 => "2",
        0x14 => "3",
        0x15 => "4",
        0x16 => "6",
        0x17 => "5",
        0x18 => "=",
        0x19 => "9",
        0x1A => "7",
        0x1B => "-",
        0x1C => "8",
        0x1D => "0",
        0x1E => "]",
        0x1F => "O",
        0x20 => "U",
        0x21 => "[",
        0x22 => "I",
        0x23 => "P",
        0x24 => "\u{21a9}",
        0x25 => "L",
        0x26 => "J",
        0x27 => "'",
        0x28 => "K",
        0x29 => ";",
        0x2A => "\\",
        0x2B => ",",
        0x2C => "/",
        0x2D => "N",
        0x2E => "M",
        0x2F => ".",
        0x30 => "\u{21e5}",
        0x31 => "Space",
        0x33 => "\u{232b}",
        0x35 => "\u{238b}",
        0x60 => "F5",
        0x61 => "F6",
        0x62 => "F7",
        0x63 => "F3",
        0x64 => "F8",
        0x65 => "F9",
        0x67 => "F11",
        0x6D => "F10",
        0x6F => "F12",
        0x76 => "F4",
        0x78 => "F2",
        0x7A => "F1",
        0x7B => "\u{2190}",
        0x7C => "\u{2192}",
        0x7D => "\u{2193}",
        0x7E => "\u{2191}",
        _ => return None,
    };
    Some(name)
}

/// Persist [`Modifiers`] as its raw `u32`, preserving bits from newer
/// versions.
mod modifier_bits {
    use super::*;

    pub fn serialize<S: Serializer>(mods: &Modifiers, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u32(mods.bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Modifiers, D::Error> {
        u32::deserialize(d).map(Modifiers::from_bits_retain)
    }
}
