// src/dispatch/dispatcher.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{AutoPassOptions, DispatchOptions};
use crate::dispatch::handlers::{decide, Snapshot};
use crate::dispatch::hooks::NodeHooks;
use crate::dispatch::{DispatchCommand, EngineEvent};
use crate::engine::ProcessEngine;
use crate::errors::{FlowgateError, Result};
use crate::proxy::{AutoPassHandle, ProxyAutoPass};

/// What handling one event did.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Commands applied, in order.
    pub commands: Vec<DispatchCommand>,
    /// Auto-pass runs started for system nodes.
    pub autopass: Vec<AutoPassHandle>,
}

/// An event whose handling failed, reported by [`Dispatcher::run`].
#[derive(Debug)]
pub struct DispatchFailure {
    pub event: EngineEvent,
    pub error: FlowgateError,
}

/// Bounded channel sized from `[dispatch].event_buffer`.
pub fn event_channel(
    options: &DispatchOptions,
) -> (mpsc::Sender<EngineEvent>, mpsc::Receiver<EngineEvent>) {
    mpsc::channel(options.event_buffer.max(1))
}

/// Async shell around [`decide`]: fetches the instance's definition and a
/// task snapshot, decides, then applies the commands to the engine.
pub struct Dispatcher<E: ProcessEngine + 'static, H: NodeHooks> {
    engine: Arc<E>,
    hooks: H,
    autopass: ProxyAutoPass<E>,
    options: DispatchOptions,
}

impl<E: ProcessEngine + 'static, H: NodeHooks> fmt::Debug for Dispatcher<E, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("options", &self.options)
            .field("autopass", self.autopass.options())
            .finish_non_exhaustive()
    }
}

impl<E: ProcessEngine + 'static, H: NodeHooks> Dispatcher<E, H> {
    pub fn new(engine: Arc<E>, hooks: H, autopass: AutoPassOptions, options: DispatchOptions) -> Self {
        let autopass = ProxyAutoPass::new(Arc::clone(&engine), autopass);
        Self {
            engine,
            hooks,
            autopass,
            options,
        }
    }

    /// Handle one event. A failed engine query or command aborts this
    /// event only.
    pub async fn handle(&self, event: EngineEvent) -> Result<DispatchReport> {
        let proc_inst_id = event.proc_inst_id().to_string();

        let definition = self.engine.definition_for_instance(&proc_inst_id).await?;
        let tasks = match &event {
            EngineEvent::TaskFinished { .. } => self.engine.list_tasks(&proc_inst_id).await?,
            EngineEvent::NodeStarted { .. } | EngineEvent::NodeEnded { .. } => Vec::new(),
        };

        let snapshot = Snapshot::new(definition.node_definitions(), tasks);
        let commands = decide(&event, &snapshot, &self.options);

        let mut report = DispatchReport::default();
        for command in commands {
            if let Some(handle) = self.execute(&proc_inst_id, &command).await? {
                report.autopass.push(handle);
            }
            report.commands.push(command);
        }

        debug!(
            instance = %proc_inst_id,
            event = %event.name(),
            node = %event.node_id(),
            commands = report.commands.len(),
            "event handled"
        );
        Ok(report)
    }

    async fn execute(&self, proc_inst_id: &str, command: &DispatchCommand) -> Result<Option<AutoPassHandle>> {
        match command {
            DispatchCommand::CloseBranch {
                gateway_id,
                predecessor_id,
                outcome,
                comment,
            } => {
                info!(
                    instance = %proc_inst_id,
                    gateway = %gateway_id,
                    predecessor = %predecessor_id,
                    outcome = %outcome,
                    "closing gateway branch"
                );
                self.engine
                    .close_branch(proc_inst_id, gateway_id, predecessor_id, *outcome, comment)
                    .await?;
            }
            DispatchCommand::FinishPendingTasks {
                node_id,
                batch_code,
                status,
                comment,
            } => {
                let finished = self
                    .engine
                    .finish_pending_tasks(proc_inst_id, node_id, batch_code.as_deref(), *status, comment)
                    .await?;
                debug!(
                    instance = %proc_inst_id,
                    node = %node_id,
                    batch = batch_code.as_deref().unwrap_or("*"),
                    status = ?status,
                    finished,
                    "finished pending tasks"
                );
            }
            DispatchCommand::SpawnAutoPass { node_id } => {
                debug!(instance = %proc_inst_id, node = %node_id, "spawning auto-pass");
                return Ok(Some(self.autopass.spawn(proc_inst_id, node_id)));
            }
            DispatchCommand::Forward(hook_event) => {
                self.hooks.handle(hook_event.clone()).await?;
            }
        }
        Ok(None)
    }

    /// Consume events until the channel closes. Failures are logged and
    /// sent on `errors`; the loop keeps going.
    pub async fn run(self, mut events: mpsc::Receiver<EngineEvent>, errors: mpsc::Sender<DispatchFailure>) {
        info!("dispatcher started");

        while let Some(event) = events.recv().await {
            debug!(?event, "dispatcher received event");

            if let Err(error) = self.handle(event.clone()).await {
                error!(
                    instance = %event.proc_inst_id(),
                    event = %event.name(),
                    node = %event.node_id(),
                    error = %error,
                    "event handling failed"
                );
                if errors.send(DispatchFailure { event, error }).await.is_err() {
                    warn!("dispatch error channel closed; failure dropped");
                }
            }
        }

        info!("dispatcher event channel closed; exiting");
    }
}
