//! Derives the catalog lookup key from a request's free-form context.

use serde_json::{Map, Value};

/// Key used when the request carries no usable page context.
pub const GENERAL_CONTEXT: &str = "general";

/// Resolve the context key for catalog lookups.
///
/// Returns `context["page"]` verbatim when it is a string. Unknown pages are
/// valid keys; they simply miss in the catalog later.
pub fn resolve_context_key(context: Option<&Map<String, Value>>) -> String {
    context
        .and_then(|ctx| ctx.get("page"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| GENERAL_CONTEXT.to_string())
}
