//! Dedicated terminal worker thread.
//!
//! The backend session is owned by one thread running a single-threaded
//! runtime. Everything else talks to it through [`TerminalHandle`], which
//! queues [`TerminalMessage`]s on a channel. The worker handles one message
//! at a time, so a command send can never race a screen read.

use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::config::TerminalConfig;
use crate::error::TerminalError;
use crate::terminal::{ReadOutcome, SESSION_ENDED, Stabilizer, TerminalBackend};

/// A request for the terminal worker.
#[derive(Debug)]
pub enum TerminalMessage {
    /// Type a command followed by a newline.
    Run(String),
    /// Wait for the screen to settle and reply with what it shows.
    Read(oneshot::Sender<ReadOutcome>),
    /// Open a new tab and switch to it.
    NewTab,
    /// Stop the worker.
    End,
}

struct TerminalWorker<B> {
    backend: Option<B>,
    stabilizer: Stabilizer,
    open_timeout: Duration,
}

impl<B: TerminalBackend> TerminalWorker<B> {
    async fn initialize(&mut self) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        let name = backend.name().to_string();

        match tokio::time::timeout(self.open_timeout, backend.open()).await {
            Ok(Ok(())) => tracing::info!("Terminal backend {} ready", name),
            Ok(Err(e)) => {
                tracing::error!("Failed to open terminal backend {}: {}", name, e);
                self.backend = None;
            }
            Err(_) => {
                tracing::error!(
                    "Terminal backend {} did not open within {:?}",
                    name,
                    self.open_timeout
                );
                self.backend = None;
            }
        }
    }

    async fn listen(mut self, mut rx: mpsc::UnboundedReceiver<TerminalMessage>) {
        self.initialize().await;

        while let Some(message) = rx.recv().await {
            match message {
                TerminalMessage::Run(command) => self.run_command(&command).await,
                TerminalMessage::Read(reply) => {
                    let outcome = self.read_screen().await;
                    if reply.send(outcome).is_err() {
                        tracing::debug!("Read requester went away before the reply");
                    }
                }
                TerminalMessage::NewTab => self.new_tab().await,
                TerminalMessage::End => break,
            }
        }

        if let Some(backend) = self.backend.as_mut() {
            if let Err(e) = backend.close().await {
                tracing::warn!("Failed to close terminal backend: {}", e);
            }
        }
        tracing::debug!("Terminal worker stopped");
    }

    async fn run_command(&mut self, command: &str) {
        let Some(backend) = self.backend.as_mut() else {
            tracing::error!("{}, dropping command", TerminalError::Unavailable);
            return;
        };
        if let Err(e) = backend.send_text(&format!("{command}\n")).await {
            tracing::error!("Failed to send command: {}", e);
        }
    }

    async fn read_screen(&mut self) -> ReadOutcome {
        match self.backend.as_mut() {
            Some(backend) => self.stabilizer.wait_and_read(backend).await,
            None => {
                tracing::error!("{}, nothing to read", TerminalError::Unavailable);
                ReadOutcome::Unavailable
            }
        }
    }

    async fn new_tab(&mut self) {
        let Some(backend) = self.backend.as_mut() else {
            tracing::error!("{}, cannot open a tab", TerminalError::Unavailable);
            return;
        };
        if let Err(e) = backend.new_tab().await {
            tracing::error!("Failed to open new tab: {}", e);
        }
    }
}

/// Client side of the terminal worker.
pub struct TerminalHandle {
    tx: mpsc::UnboundedSender<TerminalMessage>,
    thread: Option<JoinHandle<()>>,
    read_max_lines: usize,
    run_read_delay: Duration,
}

impl TerminalHandle {
    /// Start a worker thread that owns `backend`.
    pub fn spawn<B>(backend: B, config: &TerminalConfig) -> Result<Self, TerminalError>
    where
        B: TerminalBackend + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = TerminalWorker {
            backend: Some(backend),
            stabilizer: Stabilizer::new(config.settle_delay, config.retry_delay, config.max_polls),
            open_timeout: config.open_timeout,
        };

        let thread = std::thread::Builder::new()
            .name("terminal-worker".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        tracing::error!("Failed to build terminal worker runtime: {}", e);
                        return;
                    }
                };
                runtime.block_on(worker.listen(rx));
            })?;

        Ok(Self {
            tx,
            thread: Some(thread),
            read_max_lines: config.read_max_lines,
            run_read_delay: config.run_read_delay,
        })
    }

    /// Default number of lines returned after running a command.
    pub fn read_max_lines(&self) -> usize {
        self.read_max_lines
    }

    fn send(&self, message: TerminalMessage) -> bool {
        if self.tx.send(message).is_err() {
            tracing::error!("Terminal worker is not running");
            return false;
        }
        true
    }

    /// Type `command` followed by a newline.
    pub fn run(&self, command: &str) {
        self.send(TerminalMessage::Run(command.to_string()));
    }

    /// Wait for the screen to settle and return its recent output.
    ///
    /// Returns [`SESSION_ENDED`] if the session went away, and an empty
    /// string if the worker has no session.
    pub async fn read(&self, max_lines: usize) -> String {
        let (reply_tx, reply_rx) = oneshot::channel();
        if !self.send(TerminalMessage::Read(reply_tx)) {
            return SESSION_ENDED.to_string();
        }

        match reply_rx.await {
            Ok(ReadOutcome::Settled(lines)) | Ok(ReadOutcome::Unsettled(lines)) => {
                format_read_output(&lines, max_lines)
            }
            Ok(ReadOutcome::Ended) => {
                tracing::debug!("Terminal session ended while reading");
                SESSION_ENDED.to_string()
            }
            Ok(ReadOutcome::Unavailable) => String::new(),
            Err(_) => {
                tracing::error!("Terminal worker stopped before replying");
                SESSION_ENDED.to_string()
            }
        }
    }

    /// Run a command, give it a moment, and read the result.
    pub async fn run_and_read(&self, command: &str) -> String {
        self.run(command);
        tokio::time::sleep(self.run_read_delay).await;
        self.read(self.read_max_lines).await
    }

    /// Open a new tab in the terminal and make it active.
    pub fn new_tab(&self) {
        self.send(TerminalMessage::NewTab);
    }

    /// Stop the worker and wait for its thread to exit.
    pub fn close(&mut self) {
        let _ = self.tx.send(TerminalMessage::End);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Terminal worker thread panicked");
            }
        }
    }
}

impl Drop for TerminalHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(TerminalMessage::End);
    }
}

/// Format collected lines the way the model sees them.
///
/// Keeps the last `max_lines` lines (0 keeps everything) behind an omission
/// marker and tab-indents multi-line output.
pub fn format_read_output(lines: &[String], max_lines: usize) -> String {
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 1);

    if max_lines > 0 && lines.len() > max_lines {
        out.push(format!("...({} lines omitted)", lines.len() - max_lines));
        out.extend(lines[lines.len() - max_lines..].iter().cloned());
    } else {
        out.extend(lines.iter().cloned());
    }

    if out.len() > 1 {
        for line in &mut out {
            line.insert(0, '\t');
        }
    }

    format!("\n{}", out.join("\n"))
}
