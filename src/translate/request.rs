//! Resolve an inbound chat request into the upstream request shape.
//!
//! Defaulting policy: numeric sampling fields and `stream` are substituted
//! only when absent, so an explicit `temperature: 0` survives. The model
//! string additionally treats `""` as absent, since some clients send an
//! empty model field rather than omitting it.

use crate::config::SamplingDefaults;

use super::types::{ChatCompletionRequest, UpstreamChatRequest};

/// Pure function: inbound request + configured defaults, out comes the fully
/// resolved upstream body. Messages pass through untouched.
pub fn resolve_upstream_request(
    req: &ChatCompletionRequest,
    defaults: &SamplingDefaults,
) -> UpstreamChatRequest {
    let model = req
        .model
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(&defaults.model)
        .to_string();

    UpstreamChatRequest {
        model,
        messages: req.messages.clone(),
        temperature: req.temperature.unwrap_or(defaults.temperature),
        top_p: req.top_p.unwrap_or(defaults.top_p),
        max_tokens: req.max_tokens.unwrap_or(defaults.max_tokens),
        stream: req.stream.unwrap_or(false),
    }
}
