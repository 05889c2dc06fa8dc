//! PTY plumbing for one agent child process.
//!
//! The child runs attached to a 120×40 pseudo-terminal. A dedicated OS
//! thread pumps raw bytes from the PTY into an unbounded channel; the poll
//! loop drains that channel non-blockingly each tick, so the async side
//! never touches the blocking reader.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::thread;

use anyhow::{anyhow, Result};
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc;

/// Grid size the whole pipeline is built around.
const PTY_ROWS: u16 = 40;
const PTY_COLS: u16 = 120;

pub struct PtyProcess {
    writer: Mutex<Box<dyn Write + Send>>,
    child: Mutex<Box<dyn Child + Send + Sync>>,
    /// Kept alive for the lifetime of the session; dropping the master
    /// closes the PTY under the child.
    _master: Mutex<Box<dyn MasterPty + Send>>,
    pid: Option<u32>,
}

impl PtyProcess {
    /// Spawn `command args…` in `cwd` on a fresh PTY. Returns the process
    /// handle and the channel of raw output bytes.
    pub fn spawn(
        command: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Vec<u8>>)> {
        let pty_system = native_pty_system();
        let pair = pty_system.openpty(PtySize {
            rows: PTY_ROWS,
            cols: PTY_COLS,
            pixel_width: 0,
            pixel_height: 0,
        })?;

        let mut cmd = CommandBuilder::new(command);
        cmd.args(args);
        cmd.cwd(cwd);
        let child = pair.slave.spawn_command(cmd)?;
        let pid = child.process_id();
        drop(pair.slave);

        let (tx, rx) = mpsc::unbounded_channel();
        let mut reader = pair.master.try_clone_reader()?;
        thread::spawn(move || {
            let mut buffer = [0u8; 4096];
            while let Ok(n) = std::io::Read::read(&mut reader, &mut buffer) {
                if n == 0 {
                    break;
                }
                if tx.send(buffer[..n].to_vec()).is_err() {
                    break;
                }
            }
        });

        let writer = pair.master.take_writer()?;
        Ok((
            PtyProcess {
                writer: Mutex::new(writer),
                child: Mutex::new(child),
                _master: Mutex::new(pair.master),
                pid,
            },
            rx,
        ))
    }

    /// Write keystrokes to the agent's terminal.
    pub fn write_all(&self, data: &[u8]) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow!("pty writer poisoned"))?;
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    /// Non-blocking exit check; `Some(code)` once the child is gone.
    pub fn try_exit(&self) -> Option<u32> {
        let mut child = self.child.lock().ok()?;
        match child.try_wait() {
            Ok(Some(status)) => Some(status.exit_code()),
            _ => None,
        }
    }

    /// Ask the child to shut down (SIGTERM).
    pub fn terminate(&self) {
        if let Some(pid) = self.pid {
            // SAFETY: plain signal delivery to a pid we spawned.
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
        }
    }

    /// Force-kill the child (SIGKILL).
    pub fn kill(&self) {
        if let Ok(mut child) = self.child.lock() {
            let _ = child.kill();
        }
    }
}
