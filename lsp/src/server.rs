//! Server handle. Owns a `ruff server` child process and its LSP session.
//!
//! Three tasks run per server: a writer draining [`WriterCommand`]s into
//! stdin, a reader dispatching frames from stdout, and a monitor that owns
//! the child and reports how it exited.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use ruff_host_config::{RuffSettings, translate};
use tokio::process::Command;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::Instant;

use crate::codec::{FrameReader, FrameWriter};
use crate::error::{SupervisorError, TransportError};
use crate::middleware::MiddlewareChain;
use crate::protocol::{self, Notification, PublishDiagnosticsParams, Request};
use crate::types::{ExitKind, ServerEvent, ServerId};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Hard cap on graceful shutdown; after this the child is killed.
pub(crate) const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(2);

/// How long to wait for the monitor to observe a kill.
const KILL_GRACE: Duration = Duration::from_millis(500);

const WRITER_CHANNEL_CAPACITY: usize = 64;

const SERVER_ARGS: &[&str] = &["server"];

const LANGUAGE_ID: &str = "python";

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<serde_json::Value>>>>;

enum WriterCommand {
    Send(serde_json::Value),
    Shutdown,
}

enum IncomingFrame {
    Response {
        id: u64,
        body: serde_json::Value,
    },
    ServerRequest {
        id: serde_json::Value,
        method: String,
        params: Option<serde_json::Value>,
    },
    Notification {
        method: String,
        params: Option<serde_json::Value>,
    },
}

enum MonitorWake {
    Exited(io::Result<ExitStatus>),
    Stop(Instant),
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut out = Vec::new();
    for c in path.components() {
        match c {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other),
        }
    }
    out.iter().collect()
}

fn parse_incoming(frame: &serde_json::Value) -> Option<IncomingFrame> {
    let id = frame.get("id");
    let method = frame
        .get("method")
        .and_then(|m| m.as_str())
        .map(String::from);
    let has_result_or_error = frame.get("result").is_some() || frame.get("error").is_some();

    match (id, method, has_result_or_error) {
        (Some(id_val), None, true) => Some(IncomingFrame::Response {
            id: id_val.as_u64()?,
            body: frame.clone(),
        }),
        (Some(id_val), Some(method), _) => Some(IncomingFrame::ServerRequest {
            id: id_val.clone(),
            method,
            params: frame.get("params").cloned(),
        }),
        (None, Some(method), _) => Some(IncomingFrame::Notification {
            method,
            params: frame.get("params").cloned(),
        }),
        _ => None,
    }
}

fn exit_from_wait(status: io::Result<ExitStatus>, requested: bool) -> ExitKind {
    match status {
        Ok(status) => ExitKind::classify(status.code(), requested),
        Err(_) if requested => ExitKind::Requested,
        Err(e) => ExitKind::Lost(e.to_string()),
    }
}

/// Everything the reader task needs to route one incoming frame.
struct Dispatcher {
    server: ServerId,
    pending: PendingMap,
    event_tx: mpsc::Sender<ServerEvent>,
    writer_tx: mpsc::Sender<WriterCommand>,
    /// Normalized workspace folders; diagnostics outside all of them are dropped.
    workspace_roots: Vec<PathBuf>,
    settings: Arc<RuffSettings>,
    middleware: MiddlewareChain,
}

impl Dispatcher {
    async fn dispatch(&self, frame: &serde_json::Value) {
        let Some(incoming) = parse_incoming(frame) else {
            tracing::trace!("Ignoring malformed JSON-RPC frame from {}", self.server);
            return;
        };

        match incoming {
            IncomingFrame::Response { id, body } => {
                let sender = self.pending.lock().await.remove(&id);
                if let Some(tx) = sender {
                    let _ = tx.send(body);
                }
            }
            IncomingFrame::ServerRequest { id, method, params } => {
                let response = self.answer_request(id, &method, params.as_ref());
                let _ = self.writer_tx.send(WriterCommand::Send(response)).await;
            }
            IncomingFrame::Notification { method, params } => {
                self.handle_notification(&method, params).await;
            }
        }
    }

    /// Build the response to a server-initiated request.
    ///
    /// Every request gets an answer; an unanswered request can stall the server.
    fn answer_request(
        &self,
        id: serde_json::Value,
        method: &str,
        params: Option<&serde_json::Value>,
    ) -> serde_json::Value {
        match method {
            "workspace/configuration" => serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": protocol::configuration_response(params, &self.settings)
            }),
            "client/registerCapability"
            | "client/unregisterCapability"
            | "window/workDoneProgress/create" => serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": null
            }),
            _ => {
                tracing::debug!(
                    "{} sent request: {method}; replying method not found",
                    self.server
                );
                serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {
                        "code": -32601,
                        "message": format!("Method not found: {method}")
                    }
                })
            }
        }
    }

    async fn handle_notification(&self, method: &str, params: Option<serde_json::Value>) {
        match method {
            "textDocument/publishDiagnostics" => {
                let Some(params) = params else { return };
                let diag_params = match serde_json::from_value::<PublishDiagnosticsParams>(params) {
                    Ok(diag_params) => self.middleware.apply(diag_params),
                    Err(e) => {
                        tracing::debug!("Failed to parse publishDiagnostics from {}: {e}", self.server);
                        return;
                    }
                };
                let Some(path) = protocol::file_uri_to_path(&diag_params.uri) else {
                    tracing::debug!("Ignoring diagnostics for non-file URI {}", diag_params.uri);
                    return;
                };
                let normalized = normalize_path(&path);
                if !self
                    .workspace_roots
                    .iter()
                    .any(|root| normalized.starts_with(root))
                {
                    tracing::warn!(
                        "{} reported diagnostics for path outside workspace: {}",
                        self.server,
                        path.display()
                    );
                    return;
                }
                let items = diag_params
                    .diagnostics
                    .iter()
                    .map(|d| d.to_normalized(&path))
                    .collect();
                let _ = self
                    .event_tx
                    .send(ServerEvent::Diagnostics { path, items })
                    .await;
            }
            "window/logMessage" | "window/showMessage" => {
                let message = params
                    .as_ref()
                    .and_then(|p| p.get("message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or_default();
                tracing::debug!(server = %self.server, "{message}");
            }
            _ => {
                tracing::trace!("Ignoring notification from {}: {method}", self.server);
            }
        }
    }
}

pub(crate) struct RunningServer {
    id: ServerId,
    writer_tx: mpsc::Sender<WriterCommand>,
    next_id: u64,
    pending: PendingMap,
    /// URIs of documents we've sent didOpen for (to distinguish didOpen vs didChange).
    opened_docs: HashSet<String>,
    /// Per-document version counter for didChange.
    doc_versions: HashMap<String, i32>,
    /// Tells the monitor to stop the child, with the deadline for a voluntary exit.
    stop_tx: Option<oneshot::Sender<Instant>>,
    monitor_handle: tokio::task::JoinHandle<()>,
    reader_handle: tokio::task::JoinHandle<()>,
    writer_handle: tokio::task::JoinHandle<()>,
}

impl RunningServer {
    /// Spawn and initialize a server for `workspace_roots`, which must be
    /// directories. The first one is the working directory.
    pub async fn start(
        id: ServerId,
        binary: &Path,
        settings: Arc<RuffSettings>,
        workspace_roots: &[PathBuf],
        event_tx: mpsc::Sender<ServerEvent>,
        middleware: MiddlewareChain,
    ) -> Result<Self, SupervisorError> {
        let Some(primary_root) = workspace_roots.first() else {
            return Err(SupervisorError::Initialize(
                "no workspace folder to serve".to_string(),
            ));
        };

        let mut cmd = Command::new(binary);
        cmd.args(SERVER_ARGS)
            .current_dir(primary_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            binary: binary.to_path_buf(),
            source,
        })?;

        let (Some(stdout), Some(stdin)) = (child.stdout.take(), child.stdin.take()) else {
            return Err(SupervisorError::Initialize(
                "child stdio was not captured".to_string(),
            ));
        };

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let (writer_tx, mut writer_rx) = mpsc::channel::<WriterCommand>(WRITER_CHANNEL_CAPACITY);
        let writer_handle = tokio::spawn(async move {
            let mut writer = FrameWriter::new(stdin);
            while let Some(cmd) = writer_rx.recv().await {
                match cmd {
                    WriterCommand::Send(frame) => {
                        if let Err(e) = writer.write_frame(&frame).await {
                            if e.is_expected_during_shutdown() {
                                tracing::debug!("{id} stdin closed: {e}");
                            } else {
                                tracing::warn!("{id} write error: {e}");
                            }
                            break;
                        }
                    }
                    WriterCommand::Shutdown => break,
                }
            }
        });

        let dispatcher = Dispatcher {
            server: id,
            pending: pending.clone(),
            event_tx: event_tx.clone(),
            writer_tx: writer_tx.clone(),
            workspace_roots: workspace_roots.iter().map(|root| normalize_path(root)).collect(),
            settings: settings.clone(),
            middleware,
        };
        let reader_handle = tokio::spawn(async move {
            let mut reader = FrameReader::new(stdout);
            loop {
                match reader.read_frame().await {
                    Ok(Some(frame)) => dispatcher.dispatch(&frame).await,
                    Ok(None) => {
                        tracing::info!("{} closed stdout", dispatcher.server);
                        break;
                    }
                    Err(error) => {
                        let _ = dispatcher
                            .event_tx
                            .send(ServerEvent::TransportFailed {
                                server: dispatcher.server,
                                error,
                            })
                            .await;
                        break;
                    }
                }
            }
            // Nobody will answer outstanding requests now.
            dispatcher.pending.lock().await.clear();
        });

        let (stop_tx, stop_rx) = oneshot::channel::<Instant>();
        let monitor_handle = tokio::spawn(async move {
            let wake = tokio::select! {
                biased;
                status = child.wait() => MonitorWake::Exited(status),
                // A dropped sender means the handle was discarded: stop immediately.
                stop = stop_rx => MonitorWake::Stop(stop.unwrap_or_else(|_| Instant::now())),
            };
            let exit = match wake {
                MonitorWake::Exited(status) => exit_from_wait(status, false),
                MonitorWake::Stop(deadline) => {
                    let status = match tokio::time::timeout_at(deadline, child.wait()).await {
                        Ok(status) => status,
                        Err(_) => {
                            tracing::debug!("{id} didn't exit in time, killing");
                            let _ = child.start_kill();
                            child.wait().await
                        }
                    };
                    exit_from_wait(status, true)
                }
            };
            let _ = event_tx.send(ServerEvent::Exited { server: id, exit }).await;
        });

        let mut handle = Self {
            id,
            writer_tx,
            next_id: 1,
            pending,
            opened_docs: HashSet::new(),
            doc_versions: HashMap::new(),
            stop_tx: Some(stop_tx),
            monitor_handle,
            reader_handle,
            writer_handle,
        };

        handle.initialize(workspace_roots, &settings).await?;

        Ok(handle)
    }

    async fn initialize(
        &mut self,
        workspace_roots: &[PathBuf],
        settings: &RuffSettings,
    ) -> Result<(), SupervisorError> {
        let folders = workspace_roots
            .iter()
            .map(|root| protocol::WorkspaceFolder::from_path(root))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SupervisorError::Initialize(e.to_string()))?;

        let params = protocol::initialize_params(
            &folders,
            translate::initialization_options(settings),
        );
        let response = self.send_request("initialize", Some(params)).await?;

        if let Some(error) = response.get("error") {
            return Err(SupervisorError::Initialize(
                error["message"]
                    .as_str()
                    .unwrap_or("unknown error")
                    .to_string(),
            ));
        }

        self.send_notification("initialized", Some(serde_json::json!({})))
            .await
    }

    async fn send_request(
        &mut self,
        method: &'static str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, SupervisorError> {
        let id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let request = Request::new(id, method, params);
        let frame = serde_json::to_value(&request).map_err(TransportError::from)?;
        if self
            .writer_tx
            .send(WriterCommand::Send(frame))
            .await
            .is_err()
        {
            self.pending.lock().await.remove(&id);
            return Err(SupervisorError::ChannelClosed);
        }

        match tokio::time::timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => {
                // Reader task dropped / server exited; avoid leaking the pending entry.
                self.pending.lock().await.remove(&id);
                Err(SupervisorError::ChannelClosed)
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(SupervisorError::RequestTimedOut { method })
            }
        }
    }

    async fn send_notification(
        &self,
        method: &'static str,
        params: Option<serde_json::Value>,
    ) -> Result<(), SupervisorError> {
        let notification = Notification::new(method, params);
        let frame = serde_json::to_value(&notification).map_err(TransportError::from)?;
        self.writer_tx
            .send(WriterCommand::Send(frame))
            .await
            .map_err(|_| SupervisorError::ChannelClosed)
    }

    /// Send didOpen the first time a URI is seen, didChange afterwards.
    pub async fn notify_file_changed(&mut self, uri: &str, text: &str) -> Result<(), SupervisorError> {
        if self.opened_docs.contains(uri) {
            let version = self.doc_versions.entry(uri.to_string()).or_insert(0);
            *version += 1;
            let params = protocol::did_change_params(uri, *version, text);
            self.send_notification("textDocument/didChange", Some(params))
                .await
        } else {
            let version = 1;
            self.doc_versions.insert(uri.to_string(), version);
            self.opened_docs.insert(uri.to_string());
            let params = protocol::did_open_params(uri, LANGUAGE_ID, version, text);
            self.send_notification("textDocument/didOpen", Some(params))
                .await
        }
    }

    /// Shut the server down within [`SHUTDOWN_DEADLINE`], killing it if needed.
    ///
    /// Never waits longer than the deadline plus a short kill grace.
    pub async fn shutdown(mut self) {
        let deadline = Instant::now() + SHUTDOWN_DEADLINE;

        let graceful = async {
            if let Ok(response) = self.send_request("shutdown", None).await
                && response.get("error").is_none()
            {
                let _ = self.send_notification("exit", None).await;
            }
        };
        if tokio::time::timeout_at(deadline, graceful).await.is_err() {
            tracing::debug!("{} didn't acknowledge shutdown before the deadline", self.id);
        }

        let _ = self.writer_tx.try_send(WriterCommand::Shutdown);

        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(deadline);
        }

        let remaining = deadline.saturating_duration_since(Instant::now()) + KILL_GRACE;
        if tokio::time::timeout(remaining, &mut self.monitor_handle)
            .await
            .is_err()
        {
            tracing::warn!("{} still running after kill; continuing", self.id);
        }

        self.reader_handle.abort();
        self.writer_handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Harness {
        dispatcher: Dispatcher,
        event_rx: mpsc::Receiver<ServerEvent>,
        writer_rx: mpsc::Receiver<WriterCommand>,
    }

    #[cfg(windows)]
    fn test_workspace_root() -> PathBuf {
        PathBuf::from(r"C:\project")
    }

    #[cfg(not(windows))]
    fn test_workspace_root() -> PathBuf {
        PathBuf::from("/project")
    }

    #[cfg(windows)]
    const APP_URI: &str = "file:///C:/project/app.py";
    #[cfg(not(windows))]
    const APP_URI: &str = "file:///project/app.py";

    fn harness(settings: RuffSettings) -> Harness {
        let (event_tx, event_rx) = mpsc::channel(32);
        let (writer_tx, writer_rx) = mpsc::channel(32);
        Harness {
            dispatcher: Dispatcher {
                server: ServerId(1),
                pending: Arc::new(Mutex::new(HashMap::new())),
                event_tx,
                writer_tx,
                workspace_roots: vec![test_workspace_root()],
                settings: Arc::new(settings),
                middleware: MiddlewareChain::standard(),
            },
            event_rx,
            writer_rx,
        }
    }

    fn publish_frame(uri: &str) -> serde_json::Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "method": "textDocument/publishDiagnostics",
            "params": {
                "uri": uri,
                "diagnostics": [{
                    "range": { "start": { "line": 0, "character": 7 }, "end": { "line": 0, "character": 9 } },
                    "severity": 2,
                    "code": "F401",
                    "source": "Ruff",
                    "message": "`os` imported but unused"
                }]
            }
        })
    }

    #[tokio::test]
    async fn test_dispatch_response_routes_to_pending() {
        let h = harness(RuffSettings::default());

        let (tx, rx) = oneshot::channel();
        h.dispatcher.pending.lock().await.insert(1, tx);

        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "capabilities": {} }
        });
        h.dispatcher.dispatch(&frame).await;

        let response = rx.await.unwrap();
        assert!(response["result"]["capabilities"].is_object());
        assert!(h.dispatcher.pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_publish_diagnostics_runs_middleware() {
        let mut h = harness(RuffSettings::default());

        h.dispatcher.dispatch(&publish_frame(APP_URI)).await;

        match h.event_rx.try_recv().unwrap() {
            ServerEvent::Diagnostics { path, items } => {
                assert_eq!(path, test_workspace_root().join("app.py"));
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].excerpt(), "F401 — `os` imported but unused");
                assert_eq!(items[0].position().start.column, 7);
            }
            other => panic!("expected Diagnostics event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_diagnostics_outside_workspace_rejected() {
        let mut h = harness(RuffSettings::default());

        #[cfg(windows)]
        let uri = "file:///C:/elsewhere/app.py";
        #[cfg(not(windows))]
        let uri = "file:///elsewhere/app.py";
        h.dispatcher.dispatch(&publish_frame(uri)).await;

        assert!(h.event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_diagnostics_accepted_for_any_workspace_folder() {
        let mut h = harness(RuffSettings::default());
        #[cfg(windows)]
        let (second_root, second_uri, outside_uri) = (
            PathBuf::from(r"C:\shared"),
            "file:///C:/shared/lib/app.py",
            "file:///C:/elsewhere/app.py",
        );
        #[cfg(not(windows))]
        let (second_root, second_uri, outside_uri) = (
            PathBuf::from("/shared"),
            "file:///shared/lib/app.py",
            "file:///elsewhere/app.py",
        );
        h.dispatcher.workspace_roots.push(second_root.clone());

        h.dispatcher.dispatch(&publish_frame(APP_URI)).await;
        h.dispatcher.dispatch(&publish_frame(second_uri)).await;
        h.dispatcher.dispatch(&publish_frame(outside_uri)).await;

        let mut paths = Vec::new();
        while let Ok(event) = h.event_rx.try_recv() {
            match event {
                ServerEvent::Diagnostics { path, .. } => paths.push(path),
                other => panic!("expected Diagnostics event, got {other:?}"),
            }
        }
        assert_eq!(
            paths,
            vec![
                test_workspace_root().join("app.py"),
                second_root.join("lib").join("app.py")
            ]
        );
    }

    #[tokio::test]
    async fn test_publish_diagnostics_path_traversal_rejected() {
        let mut h = harness(RuffSettings::default());

        #[cfg(windows)]
        let uri = "file:///C:/project/../etc/app.py";
        #[cfg(not(windows))]
        let uri = "file:///project/../etc/app.py";
        h.dispatcher.dispatch(&publish_frame(uri)).await;

        assert!(h.event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_workspace_configuration_answered_with_settings() {
        let mut h = harness(RuffSettings {
            line_length: Some(100),
            ..RuffSettings::default()
        });

        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "workspace/configuration",
            "params": { "items": [{ "section": "ruff" }] }
        });
        h.dispatcher.dispatch(&frame).await;

        match h.writer_rx.try_recv().unwrap() {
            WriterCommand::Send(response) => {
                assert_eq!(response["id"], 7);
                assert_eq!(response["result"][0]["lineLength"], 100);
            }
            WriterCommand::Shutdown => panic!("expected Send, got Shutdown"),
        }
    }

    #[tokio::test]
    async fn test_register_capability_acknowledged() {
        let mut h = harness(RuffSettings::default());

        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "id": "reg-1",
            "method": "client/registerCapability",
            "params": { "registrations": [] }
        });
        h.dispatcher.dispatch(&frame).await;

        match h.writer_rx.try_recv().unwrap() {
            WriterCommand::Send(response) => {
                assert_eq!(response["id"], "reg-1");
                assert!(response["result"].is_null());
                assert!(response.get("error").is_none());
            }
            WriterCommand::Shutdown => panic!("expected Send, got Shutdown"),
        }
    }

    #[tokio::test]
    async fn test_unknown_server_request_gets_method_not_found() {
        let mut h = harness(RuffSettings::default());

        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "workspace/applyEdit",
            "params": {}
        });
        h.dispatcher.dispatch(&frame).await;

        match h.writer_rx.try_recv().unwrap() {
            WriterCommand::Send(response) => {
                assert_eq!(response["error"]["code"], -32601);
                let msg = response["error"]["message"].as_str().unwrap();
                assert!(msg.contains("workspace/applyEdit"));
            }
            WriterCommand::Shutdown => panic!("expected Send, got Shutdown"),
        }
    }

    #[tokio::test]
    async fn test_log_message_ignored() {
        let mut h = harness(RuffSettings::default());

        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "window/logMessage",
            "params": { "type": 3, "message": "hello" }
        });
        h.dispatcher.dispatch(&frame).await;

        assert!(h.event_rx.try_recv().is_err());
        assert!(h.writer_rx.try_recv().is_err());
    }

    #[test]
    fn test_exit_from_wait_error_paths() {
        let err = || Err(io::Error::other("wait failed"));
        assert_eq!(exit_from_wait(err(), true), ExitKind::Requested);
        assert!(matches!(exit_from_wait(err(), false), ExitKind::Lost(_)));
    }

    #[test]
    fn test_normalize_path_resolves_parent_components() {
        assert_eq!(
            normalize_path(Path::new("/project/src/../app.py")),
            PathBuf::from("/project/app.py")
        );
        assert_eq!(
            normalize_path(Path::new("/project/./app.py")),
            PathBuf::from("/project/app.py")
        );
    }
}
