//! Unix-socket [`CommandSource`] implementation.
//!
//! This is the scriptable stand-in for the menu: anything a menu click can
//! do is one line away.  Clients are served one at a time; a client may send
//! any number of lines and gets one reply line per non-blank request.
//!
//! # Wire format
//!
//! ```text
//! → {"Switch":"Coding"}
//! ← ok
//! → "ShowAll"
//! ← ok
//! → {"Capture":{"name":"Docs","windows":["google-chrome:0"]}}
//! ← ok
//! → {"Edit":{"workspace":"Docs","windows":["google-chrome:0","kitty:0"]}}
//! ← ok
//! → {"Rename":{"workspace":0,"name":"Mail"}}
//! ← ok
//! → {"RecordShortcut":"Mail"}
//! ← ok
//! → {"Remove":"Mail"
//! ← error: EOF while parsing an object at line 1 column 16
//! → "Shutdown"
//! ← ok
//! ```
//!
//! `ok` means the command was queued, not that it succeeded; failures while
//! executing are logged by the daemon.  `"Shutdown"` also stops the listener
//! and removes the socket file.

use crate::command::Command;
use crate::traits::CommandSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Errors produced by the Unix socket transports.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a client session ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// The client hung up; wait for the next one.
    Disconnected,
    /// The listener must stop: shutdown was requested or nobody is
    /// receiving commands anymore.
    Stop,
}

/// A [`CommandSource`] serving newline-delimited JSON [`Command`]s on a
/// Unix stream socket.
pub struct UnixSocketListener {
    path: PathBuf,
}

impl UnixSocketListener {
    /// The socket file is created when [`run`](CommandSource::run) is called.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `$XDG_RUNTIME_DIR/ctxswitch.sock`, or the temp dir when unset.
    pub fn default_path() -> PathBuf {
        dirs::runtime_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("ctxswitch.sock")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn serve(&self, stream: UnixStream, sink: &mpsc::Sender<Command>) -> std::io::Result<SessionEnd> {
        let mut replies = stream.try_clone()?;
        for line in BufReader::new(stream).lines() {
            let line = line?;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            let cmd = match serde_json::from_str::<Command>(text) {
                Ok(cmd) => cmd,
                Err(e) => {
                    warn!("rejected {:?}: {}", text, e);
                    reply(&mut replies, &format!("error: {}", e));
                    continue;
                }
            };
            debug!("queued {:?}", cmd);
            let shutdown = matches!(cmd, Command::Shutdown);
            if shutdown {
                // Gone before the daemon can act on it.
                let _ = std::fs::remove_file(&self.path);
            }
            if sink.send(cmd).is_err() {
                reply(&mut replies, "error: daemon is shutting down");
                return Ok(SessionEnd::Stop);
            }
            reply(&mut replies, "ok");
            if shutdown {
                return Ok(SessionEnd::Stop);
            }
        }
        Ok(SessionEnd::Disconnected)
    }
}

/// Replies are best effort: a client may close its end without reading.
fn reply(stream: &mut UnixStream, text: &str) {
    if let Err(e) = writeln!(stream, "{}", text) {
        debug!("reply not delivered: {}", e);
    }
}

impl CommandSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind and serve until shutdown is requested or the receiving end of
    /// `sink` is dropped.  Blocks; run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        // A previous run may have left its socket file behind.
        let _ = std::fs::remove_file(&self.path);
        let listener = UnixListener::bind(&self.path)?;
        info!("command socket at {}", self.path.display());

        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    error!("accept error: {}", e);
                    continue;
                }
            };
            match self.serve(stream, &sink) {
                Ok(SessionEnd::Disconnected) => debug!("client done"),
                Ok(SessionEnd::Stop) => break,
                Err(e) => warn!("client connection failed: {}", e),
            }
        }
        let _ = std::fs::remove_file(&self.path);
        info!("command socket closed");
        Ok(())
    }
}

//  Tests
