use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::AssessmentConfig;
use crate::controller::{Deadline, Internal, SessionCommand, SessionController, SessionDeps};
use crate::notice::{SessionNotice, SessionSnapshot};
use crate::recognizer::RecognizerEvent;
use crate::{Result, SessionError};

/// Single-task event loop driving a [`SessionController`].
///
/// Commands from the [`SessionHandle`], results of spawned work and timer
/// deadlines are all handled on this task, so controller state is never
/// shared.
pub struct SessionRuntime {
    controller: SessionController,
    commands_rx: mpsc::UnboundedReceiver<SessionCommand>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
}

impl SessionRuntime {
    pub fn new(
        config: AssessmentConfig,
        deps: SessionDeps,
    ) -> (Self, SessionHandle, mpsc::UnboundedReceiver<SessionNotice>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();

        let controller = SessionController::new(config, deps, internal_tx, notices_tx);
        let runtime = Self {
            controller,
            commands_rx,
            internal_rx,
        };
        (runtime, SessionHandle { tx: commands_tx }, notices_rx)
    }

    /// Build and spawn the runtime on the current tokio runtime.
    pub fn spawn(
        config: AssessmentConfig,
        deps: SessionDeps,
    ) -> (
        JoinHandle<()>,
        SessionHandle,
        mpsc::UnboundedReceiver<SessionNotice>,
    ) {
        let (runtime, handle, notices) = Self::new(config, deps);
        (tokio::spawn(runtime.run()), handle, notices)
    }

    /// Run until the session completes, is shut down, or every handle is
    /// dropped.
    pub async fn run(mut self) {
        tracing::info!("Session started");
        self.controller.start();

        loop {
            let deadline = self.controller.next_deadline();

            tokio::select! {
                biased;

                Some(event) = self.internal_rx.recv() => {
                    self.controller.handle_internal(event);
                }

                command = self.commands_rx.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => {
                        self.controller.shutdown();
                        break;
                    }
                    Some(command) => self.controller.handle_command(command),
                },

                kind = wait_for(deadline) => {
                    self.controller.on_deadline(kind);
                }
            }

            if self.controller.is_completed() {
                break;
            }
        }

        tracing::info!("Session ended");
    }
}

async fn wait_for(deadline: Option<(Instant, Deadline)>) -> Deadline {
    match deadline {
        Some((at, kind)) => {
            tokio::time::sleep_until(at).await;
            kind
        }
        None => std::future::pending().await,
    }
}

/// Cheap, cloneable handle for talking to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Submit typed text as a user turn.
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::SendText(text.into()))
    }

    pub fn toggle_voice(&self) -> Result<()> {
        self.send(SessionCommand::ToggleVoice)
    }

    pub fn finish_now(&self) -> Result<()> {
        self.send(SessionCommand::FinishNow)
    }

    /// Forward an event reported by the speech recognizer.
    pub fn recognizer_event(&self, event: RecognizerEvent) -> Result<()> {
        self.send(SessionCommand::Recognizer(event))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown)
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot(reply_tx))?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, command: SessionCommand) -> Result<()> {
        self.tx.send(command).map_err(|_| SessionError::Closed)
    }
}
