use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::merge::Atomic;

/// Log levels as understood by the product, mapped onto logback levels when rendered.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, JsonSchema, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
    None,
}

impl LogLevel {
    /// The level literal used in `logback.xml`.
    pub fn to_logback_literal(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error | Self::Fatal => "ERROR",
            Self::None => "OFF",
        }
    }
}

/// Logging configuration of the ZooKeeper server container.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingSpec {
    /// Level of the root logger. Defaults to `INFO`.
    pub root_level: Option<LogLevel>,

    /// Threshold of the console appender. Defaults to `INFO`.
    pub console_level: Option<LogLevel>,

    /// Per-logger levels, keyed by logger name.
    #[serde(default)]
    pub loggers: BTreeMap<String, LogLevel>,
}

impl Atomic for LoggingSpec {}
