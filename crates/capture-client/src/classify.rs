//! Turning raw signals into reports.

use chrono::{SecondsFormat, Utc};
use serde_json::json;

use crate::host::ClientEnvironment;
use crate::report::{ErrorReport, ReportLevel};
use crate::signal::{render_console, ClientSignal, ConsoleArg, RequestFailure};

/// Console messages produced by the capture pipeline itself.
pub const IGNORED_CONSOLE_MESSAGES: [&str; 2] = ["Failed to log error", "Error caught by boundary"];

/// Classify a signal. Returns `None` for signals that should not be reported.
///
/// `ingest_url` is the endpoint reports are posted to; failed requests to it
/// are never reported.
pub fn classify(signal: ClientSignal, ingest_url: &str) -> Option<ErrorReport> {
    match signal {
        ClientSignal::UncaughtException {
            name,
            message,
            filename,
            line,
            column,
            stack,
        } => {
            let mut report = ErrorReport::new(name.unwrap_or_else(|| "Error".to_string()), message, ReportLevel::Error)
                .with_stack(stack)
                .with_tags(["javascript-error"]);
            if let Some(filename) = filename {
                report = report.with_meta("filename", filename);
            }
            if let Some(line) = line {
                report = report.with_meta("lineno", line);
            }
            if let Some(column) = column {
                report = report.with_meta("colno", column);
            }
            Some(report)
        }
        ClientSignal::UnhandledRejection { reason, stack } => Some(
            ErrorReport::new("Unhandled Promise Rejection", reason, ReportLevel::Error)
                .with_stack(stack)
                .with_tags(["unhandled-promise"]),
        ),
        ClientSignal::ResourceError { tag_name, source } => {
            let tag = tag_name.to_lowercase();
            let message = match &source {
                Some(source) => format!("Failed to load {}: {}", tag, source),
                None => format!("Failed to load {}", tag),
            };
            let mut report = ErrorReport::new("Resource Load Error", message, ReportLevel::Warning)
                .with_tags(["resource-error".to_string(), tag.clone()])
                .with_meta("tagName", tag);
            if let Some(source) = source {
                report = report.with_meta("source", source);
            }
            Some(report)
        }
        ClientSignal::Fetch(failure) => classify_request(failure, "fetch", ingest_url),
        ClientSignal::Xhr(failure) => classify_request(failure, "xhr", ingest_url),
        ClientSignal::Console { args } => classify_console(args),
        ClientSignal::Boundary {
            name,
            message,
            stack,
            component_stack,
        } => {
            let mut report =
                ErrorReport::new(name.unwrap_or_else(|| "Render Error".to_string()), message, ReportLevel::Error)
                    .with_stack(stack)
                    .with_tags(["react-error-boundary"]);
            if let Some(component_stack) = component_stack {
                report = report.with_meta("componentStack", component_stack);
            }
            Some(report)
        }
    }
}

fn classify_request(failure: RequestFailure, via: &str, ingest_url: &str) -> Option<ErrorReport> {
    if failure.url.starts_with(ingest_url) || (ingest_url.starts_with('/') && failure.url.ends_with(ingest_url)) {
        return None;
    }

    let method = failure.method.to_uppercase();
    let (level, status_tag, message) = match failure.status {
        Some(status) if status != 0 && status < 400 => return None,
        Some(status) if status != 0 => {
            let level = if status < 500 {
                ReportLevel::Warning
            } else {
                ReportLevel::Error
            };
            let message = format!(
                "{} {} failed with status {}{}",
                method,
                failure.url,
                status,
                failure
                    .status_text
                    .as_deref()
                    .map(|t| format!(" {}", t))
                    .unwrap_or_default()
            );
            (level, format!("status-{}", status), message)
        }
        // XHR reports status 0 when no response arrived
        _ => {
            let message = format!(
                "{} {} failed: {}",
                method,
                failure.url,
                failure.error.as_deref().unwrap_or("network error")
            );
            (ReportLevel::Error, "network-failure".to_string(), message)
        }
    };

    Some(
        ErrorReport::new("Network Error", message, level)
            .with_tags(["network-error".to_string(), via.to_string(), status_tag])
            .with_meta("requestUrl", failure.url)
            .with_meta("method", method)
            .with_meta("status", json!(failure.status)),
    )
}

fn classify_console(args: Vec<ConsoleArg>) -> Option<ErrorReport> {
    let message = render_console(&args);
    if IGNORED_CONSOLE_MESSAGES.iter().any(|m| message.contains(m)) {
        return None;
    }

    match args.into_iter().next()? {
        ConsoleArg::Error { name, stack, .. } => Some(
            ErrorReport::new(name, message, ReportLevel::Error)
                .with_stack(stack)
                .with_tags(["console-error"]),
        ),
        first if first.render().to_lowercase().contains("error") => Some(
            ErrorReport::new("Console Error", message, ReportLevel::Error).with_tags(["console-error"]),
        ),
        _ => None,
    }
}

/// Attach page, device and session context to a report.
pub fn enrich(mut report: ErrorReport, environment: &ClientEnvironment, session_id: &str) -> ErrorReport {
    if report.url.is_none() {
        report.url = environment.url.clone();
    }
    if report.user_agent.is_none() {
        report.user_agent = environment.user_agent.clone();
    }
    if report.user_id.is_none() {
        report.user_id = environment.user_id.clone();
    }

    report
        .metadata
        .insert("sessionId".to_string(), json!(session_id));
    report.metadata.insert(
        "timestamp".to_string(),
        json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    if let Some((width, height)) = environment.viewport {
        report
            .metadata
            .insert("viewport".to_string(), json!({ "width": width, "height": height }));
    }
    if let Some(memory) = environment.memory {
        report.metadata.insert("memory".to_string(), json!(memory));
    }
    if let Some(navigation) = environment.navigation {
        report.metadata.insert("navigation".to_string(), json!(navigation));
    }
    report
}
