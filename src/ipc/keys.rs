//! Unix-socket [`KeyHook`] implementation.
//!
//! A key-forwarding helper (a compositor plugin, an evdev grabber, …)
//! connects to the socket and, for every key-down it intercepts, writes one
//! JSON [`HookEvent`] line and waits for the verdict:
//!
//! ```text
//! → {"KeyDown":{"key_code":18,"flags":262144}}
//! ← consume
//! → {"KeyDown":{"key_code":0,"flags":0}}
//! ← pass
//! ```
//!
//! The helper may also report `{"Disabled":"UserInput"}` when interception
//! was switched off on its side.
//!
//! A handler that takes longer than the latency budget to answer disables
//! the hook, exactly like a host that gives up on a slow interception
//! callback: the handler then receives
//! [`HookEvent::Disabled`]`(`[`Timeout`](DisableReason::Timeout)`)` and
//! must call [`HookControl::reenable`].  While disabled, every event is
//! answered `pass` without reaching the handler.

use super::listener::UnixSocketError;
use crate::traits::{DisableReason, Disposition, HookControl, HookEvent, HookHandle, KeyHandler, KeyHook};
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default time a handler may take before the hook is disabled.
pub const DEFAULT_BUDGET: Duration = Duration::from_millis(250);

/// How often blocked accepts and reads wake up to check for removal.
const POLL: Duration = Duration::from_millis(50);

/// Whether interception is allowed: the socket's directory must exist and
/// be writable.
fn trusted(path: &Path) -> bool {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::metadata(dir)
        .map(|m| m.is_dir() && !m.permissions().readonly())
        .unwrap_or(false)
}

struct Shared {
    path: PathBuf,
    enabled: AtomicBool,
    stop: AtomicBool,
}

impl HookControl for Shared {
    fn reenable(&self) -> bool {
        if !trusted(&self.path) {
            return false;
        }
        info!("key hook re-enabled");
        self.enabled.store(true, Ordering::SeqCst);
        true
    }
}

struct Installed {
    handle: HookHandle,
    shared: Arc<Shared>,
    worker: JoinHandle<()>,
}

/// A [`KeyHook`] fed by a helper process over a Unix stream socket.
pub struct SocketKeyHook {
    path: PathBuf,
    budget: Duration,
    installed: Option<Installed>,
    next_handle: u64,
}

impl SocketKeyHook {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            budget: DEFAULT_BUDGET,
            installed: None,
            next_handle: 1,
        }
    }

    /// `$XDG_RUNTIME_DIR/ctxswitch-keys.sock`, or the temp dir when unset.
    pub fn default_path() -> PathBuf {
        dirs::runtime_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("ctxswitch-keys.sock")
    }

    /// Override the handler latency budget.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether events currently reach the installed handler.
    pub fn is_enabled(&self) -> bool {
        self.installed
            .as_ref()
            .map(|i| i.shared.enabled.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn shutdown(installed: Installed) {
        installed.shared.stop.store(true, Ordering::SeqCst);
        if installed.worker.join().is_err() {
            error!("key hook worker panicked");
        }
        let _ = std::fs::remove_file(&installed.shared.path);
    }
}

impl Drop for SocketKeyHook {
    fn drop(&mut self) {
        if let Some(installed) = self.installed.take() {
            Self::shutdown(installed);
        }
    }
}

impl KeyHook for SocketKeyHook {
    type Error = UnixSocketError;

    fn is_trusted(&self) -> bool {
        trusted(&self.path)
    }

    /// Bind the socket and serve helpers on a background thread.  Replaces
    /// any handler installed earlier.
    fn install(&mut self, handler: KeyHandler) -> Result<HookHandle, Self::Error> {
        if let Some(previous) = self.installed.take() {
            Self::shutdown(previous);
        }
        // Remove stale socket if present.
        let _ = std::fs::remove_file(&self.path);
        let listener = UnixListener::bind(&self.path)?;
        listener.set_nonblocking(true)?;
        info!("key hook listening on {}", self.path.display());

        let shared = Arc::new(Shared {
            path: self.path.clone(),
            enabled: AtomicBool::new(true),
            stop: AtomicBool::new(false),
        });
        let worker_shared = Arc::clone(&shared);
        let budget = self.budget;
        let worker = thread::spawn(move || accept_loop(listener, &worker_shared, &handler, budget));

        let handle = HookHandle(self.next_handle);
        self.next_handle += 1;
        self.installed = Some(Installed {
            handle,
            shared,
            worker,
        });
        Ok(handle)
    }

    fn remove(&mut self, handle: HookHandle) -> Result<(), Self::Error> {
        match self.installed.take() {
            Some(installed) if installed.handle == handle => {
                Self::shutdown(installed);
                info!("key hook removed");
                Ok(())
            }
            other => {
                self.installed = other;
                Err(UnixSocketError::Io(std::io::Error::new(
                    ErrorKind::NotFound,
                    format!("no key hook installed as {:?}", handle),
                )))
            }
        }
    }
}

fn accept_loop(listener: UnixListener, shared: &Shared, handler: &KeyHandler, budget: Duration) {
    while !shared.stop.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                debug!("key helper connected");
                if let Err(e) = serve(stream, shared, handler, budget) {
                    warn!("key helper connection failed: {}", e);
                }
                debug!("key helper disconnected");
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(POLL),
            Err(e) => {
                error!("accept error: {}", e);
                thread::sleep(POLL);
            }
        }
    }
}

fn serve(stream: UnixStream, shared: &Shared, handler: &KeyHandler, budget: Duration) -> std::io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(POLL))?;
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    while !shared.stop.load(Ordering::SeqCst) {
        match reader.read_line(&mut line) {
            Ok(0) => return Ok(()),
            Ok(_) => {}
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
            Err(e) => return Err(e),
        }
        if !line.ends_with('\n') {
            continue;
        }
        let text = std::mem::take(&mut line);
        if text.trim().is_empty() {
            continue;
        }
        let verdict = match serde_json::from_str::<HookEvent>(text.trim()) {
            Ok(event) => deliver(event, shared, handler, budget),
            Err(e) => {
                debug!("bad key event {:?}: {}", text.trim(), e);
                Disposition::Pass
            }
        };
        let reply = match verdict {
            Disposition::Consume => "consume\n",
            Disposition::Pass => "pass\n",
        };
        writer.write_all(reply.as_bytes())?;
    }
    Ok(())
}

fn deliver(event: HookEvent, shared: &Shared, handler: &KeyHandler, budget: Duration) -> Disposition {
    if let HookEvent::Disabled(reason) = event {
        shared.enabled.store(false, Ordering::SeqCst);
        handler(HookEvent::Disabled(reason), shared);
        return Disposition::Pass;
    }
    if !shared.enabled.load(Ordering::SeqCst) {
        return Disposition::Pass;
    }
    let started = Instant::now();
    let verdict = handler(event, shared);
    if started.elapsed() > budget {
        shared.enabled.store(false, Ordering::SeqCst);
        handler(HookEvent::Disabled(DisableReason::Timeout), shared);
    }
    verdict
}

//  Tests
