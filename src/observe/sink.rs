//! Log sink capability.

use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, trace, warn};

/// Severity attached to an observation line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured fields attached to an observation line.
pub type LogContext = HashMap<String, serde_json::Value>;

/// Destination for observation log lines.
///
/// The layer treats delivery as best effort: a sink error is swallowed and
/// can never abort the request pipeline. Which implementation is bound is a
/// construction-time injection on the layer.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn log(&self, level: LogLevel, message: &str, context: &LogContext) -> Result<()>;
}

/// Default sink: forwards to `tracing` at the mapped level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl LogSink for TracingSink {
    async fn log(&self, level: LogLevel, message: &str, context: &LogContext) -> Result<()> {
        match level {
            LogLevel::Trace => trace!(target: "outbound_cache", ?context, "{message}"),
            LogLevel::Debug => debug!(target: "outbound_cache", ?context, "{message}"),
            LogLevel::Info => info!(target: "outbound_cache", ?context, "{message}"),
            LogLevel::Warn => warn!(target: "outbound_cache", ?context, "{message}"),
            LogLevel::Error => error!(target: "outbound_cache", ?context, "{message}"),
        }
        Ok(())
    }
}

/// Captured line for [`MemorySink`] introspection.
#[derive(Debug, Clone)]
pub struct CapturedLine {
    pub level: LogLevel,
    pub message: String,
    pub context: LogContext,
}

/// Bounded in-memory sink for tests and diagnostics.
pub struct MemorySink {
    lines: Arc<RwLock<Vec<CapturedLine>>>,
    max_lines: usize,
}

impl MemorySink {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: Arc::new(RwLock::new(Vec::new())),
            max_lines,
        }
    }

    pub fn lines(&self) -> Vec<CapturedLine> {
        self.lines.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lines.write().unwrap().clear();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn log(&self, level: LogLevel, message: &str, context: &LogContext) -> Result<()> {
        let mut lines = self.lines.write().unwrap();
        lines.push(CapturedLine {
            level,
            message: message.to_string(),
            context: context.clone(),
        });
        if lines.len() > self.max_lines {
            lines.remove(0);
        }
        Ok(())
    }
}
