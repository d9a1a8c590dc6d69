use crate::stitcher::{CancelToken, CaptureConfig, PageSession};
use crate::{cdp, Error, Result, SessionConfig};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Goto(String, oneshot::Sender<Result<()>>),
    CaptureViewport(oneshot::Sender<Result<Vec<u8>>>),
    CaptureFullPage(
        CaptureConfig,
        CancelToken,
        Option<String>,
        oneshot::Sender<Result<Vec<u8>>>,
    ),
    Close(oneshot::Sender<Result<()>>),
}

/// An async-friendly capture handle backed by a dedicated worker thread.
///
/// The worker thread owns a synchronous `CdpSession` and executes commands
/// sent from async tasks, so callers get an async interface without the
/// session having to be `Send` across threads. Commands are serviced one at
/// a time, which also keeps concurrent callers from racing on the single
/// scrollable page.
#[derive(Clone)]
pub struct Capturer {
    cmd_tx: Sender<Command>,
}

impl Capturer {
    /// Create a new capturer (spawns a background thread that owns the session).
    pub async fn new(config: Option<SessionConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::spawn(move || {
            // Initialize the session on the worker thread
            let mut session = match cdp::CdpSession::new(config) {
                Ok(s) => s,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };

            let _ = init_tx.send(Ok(()));

            // Command loop
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Goto(url, resp) => {
                        let res = session.goto(&url);
                        let _ = resp.send(res);
                    }
                    Command::CaptureViewport(resp) => {
                        let res = session.capture_viewport();
                        let _ = resp.send(res);
                    }
                    Command::CaptureFullPage(cfg, cancel, path_opt, resp) => {
                        let res = session.capture_full_page(&cfg, &cancel);
                        // If a path is provided, also write to disk
                        if let Ok(ref data) = res {
                            if let Some(path) = path_opt {
                                let _ = std::fs::write(path, data);
                            }
                        }
                        let _ = resp.send(res);
                    }
                    Command::Close(resp) => {
                        let res = session.close();
                        let _ = resp.send(res);
                        break;
                    }
                }
            }
        });

        // Wait for the worker to report initialization success or failure
        let init_res = init_rx
            .await
            .map_err(|e| Error::Other(format!("Worker init canceled: {}", e)))?;
        init_res?;

        Ok(Self { cmd_tx })
    }

    /// Navigate to a URL
    pub async fn goto(&self, url: &str) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Goto(url.to_string(), tx));
        rx.await
            .map_err(|e| Error::Other(format!("Goto canceled: {}", e)))?
    }

    /// Capture only the currently visible viewport as PNG bytes.
    pub async fn capture_viewport(&self) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::CaptureViewport(tx));
        rx.await
            .map_err(|e| Error::Other(format!("CaptureViewport canceled: {}", e)))?
    }

    /// Capture the full page as a stitched PNG; if `path` is Some, the bytes
    /// will also be saved to that path. The `cancel` token can be triggered
    /// from any task to abort the run between tiles.
    pub async fn capture_full_page(
        &self,
        config: CaptureConfig,
        cancel: CancelToken,
        path: Option<&str>,
    ) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        let path_opt = path.map(|s| s.to_string());
        let _ = self
            .cmd_tx
            .send(Command::CaptureFullPage(config, cancel, path_opt, tx));
        rx.await
            .map_err(|e| Error::Other(format!("CaptureFullPage canceled: {}", e)))?
    }

    /// Shutdown the background worker and close the browser.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Close(tx));
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?
    }
}
