//! LSP message serde types for JSON-RPC communication with `ruff server`.

use std::path::{Path, PathBuf};

use ruff_host_config::{RuffSettings, translate};
use ruff_host_types::{NormalizedDiagnostic, Point, Range, Severity};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("cannot convert path to file URI: {}", path.display())]
pub(crate) struct PathToUriError {
    path: PathBuf,
}

#[derive(Debug, Serialize)]
pub(crate) struct Request {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    pub fn new(id: u64, method: &'static str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Notification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    pub fn new(method: &'static str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

/// One entry of `workspaceFolders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct WorkspaceFolder {
    pub uri: String,
    pub name: String,
}

impl WorkspaceFolder {
    pub fn from_path(path: &Path) -> Result<Self, PathToUriError> {
        let uri = path_to_file_uri(path)?.to_string();
        let name = path.file_name().map_or_else(
            || path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        );
        Ok(Self { uri, name })
    }
}

/// `initialize` params. The first folder doubles as the legacy `rootUri`.
pub(crate) fn initialize_params(
    folders: &[WorkspaceFolder],
    initialization_options: serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "processId": std::process::id(),
        "clientInfo": { "name": "ruff-host" },
        "rootUri": folders.first().map(|folder| folder.uri.as_str()),
        "initializationOptions": initialization_options,
        "capabilities": {
            "textDocument": {
                "synchronization": {
                    "dynamicRegistration": false,
                    "willSave": false,
                    "willSaveWaitUntil": false,
                    "didSave": false
                },
                "publishDiagnostics": {
                    "relatedInformation": false,
                    "codeDescriptionSupport": true
                }
            },
            "workspace": {
                "configuration": true,
                "workspaceFolders": true
            }
        },
        "workspaceFolders": folders
    })
}

pub(crate) fn did_open_params(
    uri: &str,
    language_id: &str,
    version: i32,
    text: &str,
) -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri,
            "languageId": language_id,
            "version": version,
            "text": text
        }
    })
}

pub(crate) fn did_change_params(uri: &str, version: i32, text: &str) -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri,
            "version": version
        },
        "contentChanges": [{
            "text": text
        }]
    })
}

/// Reply to a `workspace/configuration` pull.
///
/// One entry per requested item: the bare settings object for the `ruff`
/// section, the wrapped `{ "ruff": ... }` object for anything else.
pub(crate) fn configuration_response(
    params: Option<&serde_json::Value>,
    settings: &RuffSettings,
) -> serde_json::Value {
    let items = params
        .and_then(|p| p.get("items"))
        .and_then(serde_json::Value::as_array)
        .map_or(&[][..], Vec::as_slice);

    let entries: Vec<serde_json::Value> = items
        .iter()
        .map(|item| match item.get("section").and_then(|s| s.as_str()) {
            Some("ruff") => translate::server_settings(settings),
            _ => translate::workspace_configuration(settings),
        })
        .collect();
    serde_json::Value::Array(entries)
}

/// `textDocument/publishDiagnostics` payload.
///
/// Public so diagnostics middleware can inspect and rewrite it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishDiagnosticsParams {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    pub diagnostics: Vec<LspDiagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LspDiagnostic {
    pub range: LspRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub message: String,
    /// Fields this client doesn't interpret (`codeDescription`, `data`, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LspRange {
    pub start: LspPosition,
    pub end: LspPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LspPosition {
    pub line: u32,
    pub character: u32,
}

impl From<LspPosition> for Point {
    fn from(pos: LspPosition) -> Self {
        Point::new(pos.line, pos.character)
    }
}

impl LspDiagnostic {
    /// The rule code as a string, whether the server sent a string or a number.
    #[must_use]
    pub fn code_str(&self) -> Option<String> {
        match self.code.as_ref()? {
            serde_json::Value::String(code) if !code.is_empty() => Some(code.clone()),
            serde_json::Value::Number(code) => Some(code.to_string()),
            _ => None,
        }
    }

    fn documentation_url(&self) -> Option<String> {
        self.extra
            .get("codeDescription")
            .and_then(|d| d.get("href"))
            .and_then(|href| href.as_str())
            .map(String::from)
    }

    pub fn to_normalized(&self, path: &Path) -> NormalizedDiagnostic {
        NormalizedDiagnostic::new(
            self.severity
                .and_then(Severity::from_lsp)
                .unwrap_or(Severity::Warning),
            self.message.clone(),
            path.to_path_buf(),
            Range::new(self.range.start.into(), self.range.end.into()),
        )
        .with_url(self.documentation_url())
    }
}

pub(crate) fn path_to_file_uri(path: &Path) -> Result<url::Url, PathToUriError> {
    url::Url::from_file_path(path).map_err(|()| PathToUriError {
        path: path.to_path_buf(),
    })
}

pub(crate) fn file_uri_to_path(uri: &str) -> Option<PathBuf> {
    url::Url::parse(uri)
        .ok()
        .and_then(|u| u.to_file_path().ok())
}
