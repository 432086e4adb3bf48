//! Local diagnostic output.
//!
//! This is where failed telemetry ends up. It is plain process logging and is
//! never forwarded to a backend.

use serde_json::Value;
use std::sync::Mutex;
use tracing::{error, info};

pub trait DiagnosticSink: Send + Sync {
    fn log_error(&self, message: &str, context: &Value);

    fn log_info(&self, message: &str, context: &Value);
}

/// Default sink: writes through `tracing` under `insights::diagnostics`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn log_error(&self, message: &str, context: &Value) {
        if context.is_null() {
            error!(target: "insights::diagnostics", "{}", message);
        } else {
            error!(target: "insights::diagnostics", context = %context, "{}", message);
        }
    }

    fn log_info(&self, message: &str, context: &Value) {
        if context.is_null() {
            info!(target: "insights::diagnostics", "{}", message);
        } else {
            info!(target: "insights::diagnostics", context = %context, "{}", message);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEntry {
    pub level: DiagnosticLevel,
    pub message: String,
    pub context: Value,
}

/// Keeps every entry in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<DiagnosticEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: DiagnosticLevel, message: &str, context: &Value) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.push(DiagnosticEntry {
            level,
            message: message.to_string(),
            context: context.clone(),
        });
    }

    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn errors(&self) -> Vec<DiagnosticEntry> {
        self.by_level(DiagnosticLevel::Error)
    }

    pub fn infos(&self) -> Vec<DiagnosticEntry> {
        self.by_level(DiagnosticLevel::Info)
    }

    fn by_level(&self, level: DiagnosticLevel) -> Vec<DiagnosticEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn log_error(&self, message: &str, context: &Value) {
        self.push(DiagnosticLevel::Error, message, context);
    }

    fn log_info(&self, message: &str, context: &Value) {
        self.push(DiagnosticLevel::Info, message, context);
    }
}
