//! The interface to the client runtime.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::signal::{ClientSignal, SignalKind};

/// Callback the host invokes for each signal of a registered kind.
pub type Listener = Arc<dyn Fn(ClientSignal) + Send + Sync>;

/// Heap usage, where the runtime exposes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub used_heap_bytes: u64,
    pub total_heap_bytes: u64,
    pub heap_limit_bytes: u64,
}

/// Page load timings in milliseconds, where the runtime exposes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTiming {
    pub dom_content_loaded_ms: u64,
    pub load_ms: u64,
}

/// What the host knows about the current page and device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientEnvironment {
    pub url: Option<String>,
    pub user_agent: Option<String>,
    pub viewport: Option<(u32, u32)>,
    pub user_id: Option<String>,
    pub memory: Option<MemorySnapshot>,
    pub navigation: Option<NavigationTiming>,
}

/// A client runtime that can report failures.
pub trait CaptureHost: Send + Sync {
    /// Register `listener` for every signal of `kind`.
    fn register(&self, kind: SignalKind, listener: Listener);

    /// Snapshot of the current page and device.
    fn environment(&self) -> ClientEnvironment;
}
