//! Diagnostics middleware.
//!
//! Each `textDocument/publishDiagnostics` payload runs through an ordered list
//! of layers before the reader task forwards it. A layer receives the parsed
//! payload and returns the (possibly rewritten) payload for the next one.

use std::sync::Arc;

use ruff_host_types::prefix_rule_code;

use crate::protocol::PublishDiagnosticsParams;

pub trait DiagnosticsMiddleware: Send + Sync {
    fn name(&self) -> &'static str;
    fn process(&self, params: PublishDiagnosticsParams) -> PublishDiagnosticsParams;
}

/// Ordered list of middleware layers. Cheap to clone; layers are shared.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn DiagnosticsMiddleware>>,
}

impl MiddlewareChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The chain the supervisor installs by default.
    #[must_use]
    pub fn standard() -> Self {
        Self::new().with(RuleCodePrefix)
    }

    #[must_use]
    pub fn with(mut self, layer: impl DiagnosticsMiddleware + 'static) -> Self {
        self.layers.push(Arc::new(layer));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn apply(&self, params: PublishDiagnosticsParams) -> PublishDiagnosticsParams {
        self.layers.iter().fold(params, |params, layer| {
            tracing::trace!(layer = layer.name(), uri = %params.uri, "Applying diagnostics middleware");
            layer.process(params)
        })
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.layers.iter().map(|layer| layer.name()))
            .finish()
    }
}

/// Rewrites each message to `"<CODE> — <message>"`, once.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleCodePrefix;

impl DiagnosticsMiddleware for RuleCodePrefix {
    fn name(&self) -> &'static str {
        "rule-code-prefix"
    }

    fn process(&self, mut params: PublishDiagnosticsParams) -> PublishDiagnosticsParams {
        for diag in &mut params.diagnostics {
            if let Some(code) = diag.code_str() {
                diag.message = prefix_rule_code(&code, &diag.message);
            }
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(code: Option<serde_json::Value>, message: &str) -> PublishDiagnosticsParams {
        let mut diag = serde_json::json!({
            "range": { "start": { "line": 0, "character": 0 }, "end": { "line": 0, "character": 1 } },
            "message": message
        });
        if let Some(code) = code {
            diag["code"] = code;
        }
        serde_json::from_value(serde_json::json!({
            "uri": "file:///project/app.py",
            "diagnostics": [diag]
        }))
        .unwrap()
    }

    #[test]
    fn prefixes_rule_code() {
        let out = RuleCodePrefix.process(params(Some(serde_json::json!("F401")), "`os` imported but unused"));
        assert_eq!(out.diagnostics[0].message, "F401 — `os` imported but unused");
    }

    #[test]
    fn prefixing_is_idempotent() {
        let once = RuleCodePrefix.process(params(Some(serde_json::json!("E501")), "Line too long"));
        let twice = RuleCodePrefix.process(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn leaves_codeless_messages_alone() {
        let out = RuleCodePrefix.process(params(None, "SyntaxError: Expected an expression"));
        assert_eq!(out.diagnostics[0].message, "SyntaxError: Expected an expression");
    }

    struct Uppercase;

    impl DiagnosticsMiddleware for Uppercase {
        fn name(&self) -> &'static str {
            "uppercase"
        }

        fn process(&self, mut params: PublishDiagnosticsParams) -> PublishDiagnosticsParams {
            for diag in &mut params.diagnostics {
                diag.message = diag.message.to_uppercase();
            }
            params
        }
    }

    #[test]
    fn chain_applies_layers_in_order() {
        let chain = MiddlewareChain::standard().with(Uppercase);
        assert_eq!(chain.len(), 2);
        let out = chain.apply(params(Some(serde_json::json!("e501")), "line too long"));
        assert_eq!(out.diagnostics[0].message, "E501 — LINE TOO LONG");
    }

    #[test]
    fn empty_chain_is_identity() {
        let chain = MiddlewareChain::new();
        assert!(chain.is_empty());
        let input = params(Some(serde_json::json!("W291")), "Trailing whitespace");
        assert_eq!(chain.apply(input.clone()), input);
    }
}
