use serde_json::{Map, Value};

/// Structured key/value context attached to a log line.
pub type LogContext = Map<String, Value>;

/// Pluggable logger accepted by every component.
///
/// Implementations must never receive key bytes or raw PRF output; callers
/// only pass addresses, URLs, status codes and similar diagnostics.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str, context: Option<&LogContext>);
    fn info(&self, message: &str, context: Option<&LogContext>);
    fn warn(&self, message: &str, context: Option<&LogContext>);
    fn error(&self, message: &str, context: Option<&LogContext>);
}

/// Discards everything. The default for all components.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _message: &str, _context: Option<&LogContext>) {}
    fn info(&self, _message: &str, _context: Option<&LogContext>) {}
    fn warn(&self, _message: &str, _context: Option<&LogContext>) {}
    fn error(&self, _message: &str, _context: Option<&LogContext>) {}
}

/// Forwards to the `tracing` macros, rendering the context as a JSON field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

fn render(context: Option<&LogContext>) -> String {
    context
        .map(|c| Value::Object(c.clone()).to_string())
        .unwrap_or_default()
}

impl Logger for TracingLogger {
    fn debug(&self, message: &str, context: Option<&LogContext>) {
        tracing::debug!(context = %render(context), "{}", message);
    }

    fn info(&self, message: &str, context: Option<&LogContext>) {
        tracing::info!(context = %render(context), "{}", message);
    }

    fn warn(&self, message: &str, context: Option<&LogContext>) {
        tracing::warn!(context = %render(context), "{}", message);
    }

    fn error(&self, message: &str, context: Option<&LogContext>) {
        tracing::error!(context = %render(context), "{}", message);
    }
}

/// Build a [`LogContext`] from `key => value` pairs.
macro_rules! log_context {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut ctx = $crate::logger::LogContext::new();
        $( ctx.insert($key.to_string(), serde_json::json!($value)); )*
        ctx
    }};
}
