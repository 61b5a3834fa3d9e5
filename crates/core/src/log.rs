//! Per-context log routing.
//!
//! Every [`Context`](crate::Context) carries its own priority threshold and
//! handler. Messages below the threshold are dropped before formatting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Log priority, ordered from most to least verbose.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum LogPriority {
    /// Hex dumps of every report exchanged with the device.
    Raw = 10,
    Debug = 20,
    #[default]
    Info = 30,
    Error = 40,
}

impl LogPriority {
    /// Prefix used by the default handler.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Error => "error",
        }
    }

    /// Parse a priority name, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "raw" => Some(Self::Raw),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for LogPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A log sink installed on a context.
pub type LogHandler = Rc<dyn Fn(LogPriority, &str)>;

/// The handler every new context starts with: `ratbag <prefix>: <message>` on stderr.
pub fn stderr_handler() -> LogHandler {
    Rc::new(|priority, msg| eprintln!("ratbag {}: {}", priority.label(), msg))
}

/// Format `data` as space-separated hex bytes.
pub(crate) fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (i, b) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{b:02x}"));
    }
    out
}

macro_rules! log_msg {
    ($ctx:expr, $prio:expr, $($arg:tt)+) => {
        $ctx.log($prio, format_args!($($arg)+))
    };
}

macro_rules! log_raw {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::log::log_msg!($ctx, $crate::log::LogPriority::Raw, $($arg)+)
    };
}

macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::log::log_msg!($ctx, $crate::log::LogPriority::Debug, $($arg)+)
    };
}

macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::log::log_msg!($ctx, $crate::log::LogPriority::Info, $($arg)+)
    };
}

macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::log::log_msg!($ctx, $crate::log::LogPriority::Error, $($arg)+)
    };
}

/// Library bugs are reported at error priority with a fixed prefix.
macro_rules! log_bug {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::log::log_msg!($ctx, $crate::log::LogPriority::Error, "BUG: {}", format_args!($($arg)+))
    };
}

pub(crate) use {log_bug, log_debug, log_error, log_info, log_msg, log_raw};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_are_ordered() {
        assert!(LogPriority::Raw < LogPriority::Debug);
        assert!(LogPriority::Debug < LogPriority::Info);
        assert!(LogPriority::Info < LogPriority::Error);
        assert_eq!(LogPriority::default(), LogPriority::Info);
        assert_eq!(LogPriority::Raw as u32, 10);
        assert_eq!(LogPriority::Error as u32, 40);
    }

    #[test]
    fn names_parse() {
        assert_eq!(LogPriority::from_name("RAW"), Some(LogPriority::Raw));
        assert_eq!(LogPriority::from_name("debug"), Some(LogPriority::Debug));
        assert_eq!(LogPriority::from_name("verbose"), None);
    }

    #[test]
    fn hex_dump_formats_bytes() {
        assert_eq!(hex_dump(&[0x10, 0xff, 0x00]), "10 ff 00");
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn priority_serializes_lowercase() {
        let json = serde_json::to_string(&LogPriority::Debug).unwrap();
        assert_eq!(json, "\"debug\"");
    }
}
