//! Rendering of daemon log events.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the daemon renders log events on stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Flattened JSON, one event per line.
    #[default]
    Json,
    /// Terse text for terminals.
    Compact,
}

/// Unknown [`LogFormat`] name.
pub type LogFormatParseError = strum::ParseError;
