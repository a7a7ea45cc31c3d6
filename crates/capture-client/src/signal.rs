//! Raw failure signals delivered by the host runtime.

use serde::{Deserialize, Serialize};

/// The kinds of signal a host can deliver. One listener is registered per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    UncaughtException,
    UnhandledRejection,
    ResourceError,
    Fetch,
    Xhr,
    Console,
    Boundary,
}

impl SignalKind {
    pub const ALL: [SignalKind; 7] = [
        SignalKind::UncaughtException,
        SignalKind::UnhandledRejection,
        SignalKind::ResourceError,
        SignalKind::Fetch,
        SignalKind::Xhr,
        SignalKind::Console,
        SignalKind::Boundary,
    ];
}

/// A failed network request as observed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFailure {
    pub url: String,
    pub method: String,
    /// Response status, absent when the request never got a response.
    pub status: Option<u16>,
    pub status_text: Option<String>,
    /// Transport-level error when there was no response.
    pub error: Option<String>,
}

/// One argument passed to a console error call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConsoleArg {
    /// An error object.
    Error {
        name: String,
        message: String,
        stack: Option<String>,
    },
    Text { value: String },
    Value { value: serde_json::Value },
}

impl ConsoleArg {
    pub fn text(value: impl Into<String>) -> Self {
        ConsoleArg::Text { value: value.into() }
    }

    pub(crate) fn render(&self) -> String {
        match self {
            ConsoleArg::Error { name, message, .. } => format!("{}: {}", name, message),
            ConsoleArg::Text { value } => value.clone(),
            ConsoleArg::Value { value } => value.to_string(),
        }
    }
}

/// A raw failure signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientSignal {
    UncaughtException {
        name: Option<String>,
        message: String,
        filename: Option<String>,
        line: Option<u32>,
        column: Option<u32>,
        stack: Option<String>,
    },
    UnhandledRejection {
        reason: String,
        stack: Option<String>,
    },
    ResourceError {
        tag_name: String,
        source: Option<String>,
    },
    Fetch(RequestFailure),
    Xhr(RequestFailure),
    Console {
        args: Vec<ConsoleArg>,
    },
    Boundary {
        name: Option<String>,
        message: String,
        stack: Option<String>,
        component_stack: Option<String>,
    },
}

impl ClientSignal {
    pub fn kind(&self) -> SignalKind {
        match self {
            ClientSignal::UncaughtException { .. } => SignalKind::UncaughtException,
            ClientSignal::UnhandledRejection { .. } => SignalKind::UnhandledRejection,
            ClientSignal::ResourceError { .. } => SignalKind::ResourceError,
            ClientSignal::Fetch(_) => SignalKind::Fetch,
            ClientSignal::Xhr(_) => SignalKind::Xhr,
            ClientSignal::Console { .. } => SignalKind::Console,
            ClientSignal::Boundary { .. } => SignalKind::Boundary,
        }
    }
}

/// Join console arguments the way a console would print them.
pub(crate) fn render_console(args: &[ConsoleArg]) -> String {
    args.iter().map(ConsoleArg::render).collect::<Vec<_>>().join(" ")
}
