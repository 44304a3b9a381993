/// mpv preview backend: one idle mpv process driven over JSON IPC.
///
/// ```text
///   run_preview()  ◀── PreviewCommand (Stop / Start) from the App
///        │
///        ├── MpvPreview::ensure_running()   spawns mpv lazily on first Start
///        │        ├── writer_task   ← PendingRequest via mpsc → socket
///        │        └── reader_task   ← JSON lines from socket
///        │                               ├── response (request_id) → oneshot
///        │                               └── event → MpvEvent channel
///        │
///        └── (token, reason) ──▶ App    for every stream that fails
/// ```
///
/// Unix uses a domain socket, Windows a named pipe `\\.\pipe\<name>`.
use curate_core::platform;
use curate_core::preview::{PreviewCommand, StreamToken};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::Duration;
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

/// Pid of the running mpv child, 0 when none.  Read by the panic hook, which
/// cannot reach the `Child` owned by the preview worker.
static MPV_PID: AtomicU32 = AtomicU32::new(0);

/// Kill the tracked mpv child synchronously.  Used on paths where async
/// teardown and destructors never run (panic with `panic = 'abort'`).
pub fn kill_orphan() {
    let pid = MPV_PID.swap(0, Ordering::SeqCst);
    if pid == 0 {
        return;
    }
    #[cfg(unix)]
    let _ = std::process::Command::new("kill")
        .args(["-KILL", &pid.to_string()])
        .status();
    #[cfg(windows)]
    let _ = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/F"])
        .status();
    #[cfg(unix)]
    let _ = std::fs::remove_file(platform::mpv_socket_name());
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct PendingRequest {
    req_id: u64,
    payload: String, // serialised JSON line, already has '\n'
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// An unsolicited mpv message (no request_id).
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }

    /// `Some((playlist_entry_id, reason))` when this is an `end-file` caused
    /// by an error.  Ends caused by `stop` or a replaced file return `None`.
    pub fn as_end_file_error(&self) -> Option<(Option<u64>, String)> {
        if self.event_name()? != "end-file" || self.raw.get("reason")?.as_str()? != "error" {
            return None;
        }
        let entry = self.raw.get("playlist_entry_id").and_then(|v| v.as_u64());
        let reason = self
            .raw
            .get("file_error")
            .and_then(|v| v.as_str())
            .unwrap_or("stream failed")
            .to_string();
        Some((entry, reason))
    }
}

/// Cloneable handle to the writer task.
#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg)?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(Duration::from_secs(5), reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    /// Replace whatever is loaded with `url`.  Returns the playlist entry id
    /// mpv assigned, when the mpv version reports one.
    pub async fn load(&self, url: &str) -> anyhow::Result<Option<u64>> {
        let resp = self.send(json!(["loadfile", url, "replace"])).await?;
        Ok(resp
            .get("data")
            .and_then(|d| d.get("playlist_entry_id"))
            .and_then(|v| v.as_u64()))
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.send(json!(["stop"])).await?;
        Ok(())
    }
}

// ── process ───────────────────────────────────────────────────────────────────

/// Owns the mpv child and its IPC tasks.  The child is killed on drop.
pub struct MpvPreview {
    socket_name: String,
    volume: f32,
    process: Option<tokio::process::Child>,
    handle: Option<MpvHandle>,
    events: Option<mpsc::Receiver<MpvEvent>>,
}

impl MpvPreview {
    pub fn new(volume: f32) -> Self {
        Self {
            socket_name: platform::mpv_socket_name(),
            volume,
            process: None,
            handle: None,
            events: None,
        }
    }

    /// Spawn and connect on first use; later calls reuse the live process.
    pub async fn ensure_running(&mut self) -> anyhow::Result<MpvHandle> {
        if let Some(handle) = &self.handle {
            return Ok(handle.clone());
        }
        self.kill().await;

        let mpv_binary = platform::find_mpv_binary()
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;

        #[cfg(unix)]
        let _ = tokio::fs::remove_file(&self.socket_name).await;

        info!("mpv: spawning {}", mpv_binary.display());
        let child = tokio::process::Command::new(mpv_binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg("--quiet")
            .arg(platform::mpv_socket_arg())
            .arg(format!(
                "--volume={}",
                (self.volume * 100.0).clamp(0.0, 100.0).round() as i64
            ))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        MPV_PID.store(child.id().unwrap_or(0), Ordering::SeqCst);
        self.process = Some(child);

        let (event_tx, event_rx) = mpsc::channel(64);
        let handle = self.connect(event_tx).await?;
        info!("mpv: connected to IPC");
        self.handle = Some(handle.clone());
        self.events = Some(event_rx);
        Ok(handle)
    }

    #[cfg(unix)]
    async fn connect(&self, event_tx: mpsc::Sender<MpvEvent>) -> anyhow::Result<MpvHandle> {
        let socket_path = std::path::PathBuf::from(&self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if socket_path.exists() {
                if let Ok(stream) = UnixStream::connect(&socket_path).await {
                    return Ok(start_io_tasks(stream, event_tx));
                }
            }
        }
        anyhow::bail!("mpv IPC socket did not appear")
    }

    #[cfg(windows)]
    async fn connect(&self, event_tx: mpsc::Sender<MpvEvent>) -> anyhow::Result<MpvHandle> {
        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                return Ok(start_io_tasks(client, event_tx));
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }

    /// Next unsolicited event.  Pends forever while mpv is not running;
    /// `None` means the connection closed.
    async fn next_event(&mut self) -> Option<MpvEvent> {
        match self.events.as_mut() {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Forget the dead connection so the next Start respawns mpv.
    async fn reset(&mut self) {
        self.handle = None;
        self.events = None;
        self.kill().await;
    }

    pub async fn kill(&mut self) {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
            MPV_PID.store(0, Ordering::SeqCst);
        }
        #[cfg(unix)]
        let _ = tokio::fs::remove_file(&self.socket_name).await;
    }
}

fn start_io_tasks<S>(stream: S, event_tx: mpsc::Sender<MpvEvent>) -> MpvHandle
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);

    tokio::spawn(writer_task(write_half, cmd_rx, pending.clone()));
    tokio::spawn(reader_task(BufReader::new(read_half), pending, event_tx));

    MpvHandle { tx: cmd_tx }
}

async fn fail_all(pending: &PendingMap, reason: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("{}", reason)));
    }
}

async fn reader_task<R>(
    mut reader: BufReader<R>,
    pending: PendingMap,
    event_tx: mpsc::Sender<MpvEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_all(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                if let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) {
                    let mut map = pending.lock().await;
                    if let Some(tx) = map.remove(&req_id) {
                        let result = if val["error"].as_str() == Some("success") {
                            Ok(val)
                        } else {
                            let err = val["error"].as_str().unwrap_or("unknown error");
                            debug!("mpv reader: req={} err={}", req_id, err);
                            Err(anyhow::anyhow!("mpv error: {}", err))
                        };
                        let _ = tx.send(result);
                    }
                } else {
                    debug!("mpv reader: event {}", trimmed);
                    let _ = event_tx.send(MpvEvent { raw: val }).await;
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_all(&pending, "mpv IPC read error").await;
                break;
            }
        }
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: PendingMap)
where
    W: AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register before writing so the reader can always match the reply.
        pending.lock().await.insert(req.req_id, req.reply);
        debug!("mpv writer: req={} {}", req.req_id, req.payload.trim());
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

// ── preview worker ────────────────────────────────────────────────────────────

/// Execute preview commands until `cmd_rx` closes, then kill mpv.
///
/// Every stream that cannot start or later ends in error is reported on
/// `failure_tx` with the token it was started under.
pub async fn run_preview(
    mut cmd_rx: mpsc::Receiver<PreviewCommand>,
    failure_tx: mpsc::Sender<(StreamToken, String)>,
    volume: f32,
) {
    let mut mpv = MpvPreview::new(volume);
    let mut live: Option<StreamToken> = None;
    let mut live_entry: Option<u64> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                match cmd {
                    PreviewCommand::Stop => {
                        live = None;
                        live_entry = None;
                        if let Some(handle) = &mpv.handle {
                            if let Err(e) = handle.stop().await {
                                warn!("mpv: stop failed: {}", e);
                            }
                        }
                    }
                    PreviewCommand::Start { record_id, url, token } => {
                        live = Some(token);
                        live_entry = None;
                        if url.trim().is_empty() {
                            let _ = failure_tx
                                .send((token, format!("{} has no stream URL", record_id)))
                                .await;
                            continue;
                        }
                        let result = match mpv.ensure_running().await {
                            Ok(handle) => handle.load(&url).await,
                            Err(e) => Err(e),
                        };
                        match result {
                            Ok(Some(entry)) => {
                                debug!("mpv: token={} is playlist entry {}", token, entry);
                                live_entry = Some(entry);
                            }
                            Ok(None) => {}
                            Err(e) => {
                                warn!("mpv: cannot start {}: {}", url, e);
                                let _ = failure_tx.send((token, e.to_string())).await;
                            }
                        }
                    }
                }
            }
            event = mpv.next_event() => {
                match event {
                    Some(ev) => {
                        let Some((entry, reason)) = ev.as_end_file_error() else { continue };
                        if let Some(token) = failed_token(entry, live_entry, live) {
                            let _ = failure_tx.send((token, reason)).await;
                        }
                    }
                    None => {
                        warn!("mpv: IPC connection lost");
                        mpv.reset().await;
                        live_entry = None;
                        if let Some(token) = live.take() {
                            let _ = failure_tx
                                .send((token, "audio player exited".to_string()))
                                .await;
                        }
                    }
                }
            }
        }
    }

    debug!("preview worker: command channel closed");
    mpv.kill().await;
}

/// Token an `end-file` error belongs to.  An event naming an entry other
/// than the live one is from a replaced stream and is dropped; events
/// without an entry id (or an mpv that never reported one) go to the live
/// stream.
fn failed_token(
    event_entry: Option<u64>,
    live_entry: Option<u64>,
    live: Option<StreamToken>,
) -> Option<StreamToken> {
    match (event_entry, live_entry) {
        (Some(ev), Some(cur)) if ev != cur => None,
        _ => live,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_file_error_carries_entry_and_reason() {
        let ev = MpvEvent {
            raw: json!({
                "event": "end-file",
                "reason": "error",
                "playlist_entry_id": 3,
                "file_error": "loading failed"
            }),
        };
        assert_eq!(
            ev.as_end_file_error(),
            Some((Some(3), "loading failed".to_string()))
        );
    }

    #[test]
    fn test_end_file_stop_is_not_a_failure() {
        let ev = MpvEvent {
            raw: json!({ "event": "end-file", "reason": "stop", "playlist_entry_id": 3 }),
        };
        assert!(ev.as_end_file_error().is_none());
        let ev = MpvEvent {
            raw: json!({ "event": "start-file" }),
        };
        assert!(ev.as_end_file_error().is_none());
    }

    #[test]
    fn test_error_for_replaced_entry_is_dropped() {
        assert_eq!(failed_token(Some(4), Some(4), Some(9)), Some(9));
        assert_eq!(failed_token(Some(3), Some(4), Some(9)), None);
        assert_eq!(failed_token(None, Some(4), Some(9)), Some(9));
        assert_eq!(failed_token(Some(3), None, Some(9)), Some(9));
        assert_eq!(failed_token(Some(4), Some(4), None), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_kill_orphan_kills_tracked_child() {
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        MPV_PID.store(child.id(), Ordering::SeqCst);

        kill_orphan();

        let status = child.wait().unwrap();
        assert!(!status.success());
        assert_eq!(MPV_PID.load(Ordering::SeqCst), 0);
        // nothing tracked: a second call is a no-op
        kill_orphan();
    }

    #[tokio::test]
    async fn test_blank_url_fails_without_spawning() {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let (fail_tx, mut fail_rx) = mpsc::channel(4);
        let worker = tokio::spawn(run_preview(cmd_rx, fail_tx, 0.5));

        cmd_tx
            .send(PreviewCommand::Start {
                record_id: "x".into(),
                url: "  ".into(),
                token: 7,
            })
            .await
            .unwrap();
        let (token, reason) = fail_rx.recv().await.unwrap();
        assert_eq!(token, 7);
        assert!(reason.contains("no stream URL"));

        drop(cmd_tx);
        tokio::time::timeout(Duration::from_secs(2), worker)
            .await
            .unwrap()
            .unwrap();
    }
}
