// src/proxy/autopass.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, trace, warn};

use crate::config::AutoPassOptions;
use crate::engine::ProcessEngine;

/// Observable state of one auto-pass run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoPassStatus {
    Pending,
    Completed { task_id: String },
    TimedOut,
    Failed(String),
}

impl AutoPassStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AutoPassStatus::Pending)
    }
}

impl fmt::Display for AutoPassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoPassStatus::Pending => f.write_str("pending"),
            AutoPassStatus::Completed { task_id } => write!(f, "completed ({task_id})"),
            AutoPassStatus::TimedOut => f.write_str("timed out"),
            AutoPassStatus::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

/// Handle to a spawned auto-pass run.
#[derive(Debug)]
pub struct AutoPassHandle {
    proc_inst_id: String,
    node_id: String,
    status: watch::Receiver<AutoPassStatus>,
    task: JoinHandle<()>,
}

impl AutoPassHandle {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn proc_inst_id(&self) -> &str {
        &self.proc_inst_id
    }

    /// Current status without waiting.
    pub fn status(&self) -> AutoPassStatus {
        self.status.borrow().clone()
    }

    /// Wait until the run reaches a terminal status.
    pub async fn wait(mut self) -> AutoPassStatus {
        let status = match self.status.wait_for(AutoPassStatus::is_terminal).await {
            Ok(status) => status.clone(),
            // Sender gone without a terminal status: the task was aborted
            // or panicked.
            Err(_) => AutoPassStatus::Failed("auto-pass task ended unexpectedly".to_string()),
        };
        status
    }

    /// Stop polling. A pass already sent to the engine is not undone.
    pub fn cancel(self) {
        debug!(
            instance = %self.proc_inst_id,
            node = %self.node_id,
            "auto-pass cancelled"
        );
        self.task.abort();
    }
}

/// Spawns auto-pass runs against an engine.
pub struct ProxyAutoPass<E: ProcessEngine + 'static> {
    engine: Arc<E>,
    options: AutoPassOptions,
}

impl<E: ProcessEngine + 'static> Clone for ProxyAutoPass<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            options: self.options.clone(),
        }
    }
}

impl<E: ProcessEngine + 'static> ProxyAutoPass<E> {
    pub fn new(engine: Arc<E>, options: AutoPassOptions) -> Self {
        Self { engine, options }
    }

    pub fn options(&self) -> &AutoPassOptions {
        &self.options
    }

    /// Start polling `(proc_inst_id, node_id)` in the background.
    pub fn spawn(&self, proc_inst_id: &str, node_id: &str) -> AutoPassHandle {
        let (tx, rx) = watch::channel(AutoPassStatus::Pending);

        let engine = Arc::clone(&self.engine);
        let options = self.options.clone();
        let inst = proc_inst_id.to_string();
        let node = node_id.to_string();

        let task = tokio::spawn(async move {
            let status = run_autopass(engine.as_ref(), &inst, &node, &options).await;
            tx.send_replace(status);
        });

        AutoPassHandle {
            proc_inst_id: proc_inst_id.to_string(),
            node_id: node_id.to_string(),
            status: rx,
            task,
        }
    }
}

async fn run_autopass<E: ProcessEngine>(
    engine: &E,
    proc_inst_id: &str,
    node_id: &str,
    options: &AutoPassOptions,
) -> AutoPassStatus {
    match timeout(options.timeout, poll_and_pass(engine, proc_inst_id, node_id, options)).await {
        Ok(status) => status,
        Err(_) => {
            error!(
                instance = %proc_inst_id,
                node = %node_id,
                timeout_ms = options.timeout.as_millis() as u64,
                "no task appeared at system node before timeout"
            );
            AutoPassStatus::TimedOut
        }
    }
}

async fn poll_and_pass<E: ProcessEngine>(
    engine: &E,
    proc_inst_id: &str,
    node_id: &str,
    options: &AutoPassOptions,
) -> AutoPassStatus {
    loop {
        match engine.tasks_at_node(proc_inst_id, node_id).await {
            Ok(tasks) => {
                if let Some(task) = tasks.iter().find(|t| !t.is_finished) {
                    return match engine.pass_task(&task.task_id, &options.comment).await {
                        Ok(()) => {
                            info!(
                                instance = %proc_inst_id,
                                node = %node_id,
                                task = %task.task_id,
                                "system node auto-passed"
                            );
                            AutoPassStatus::Completed {
                                task_id: task.task_id.clone(),
                            }
                        }
                        Err(err) => {
                            error!(
                                instance = %proc_inst_id,
                                node = %node_id,
                                task = %task.task_id,
                                error = %err,
                                "failed to pass system task"
                            );
                            AutoPassStatus::Failed(err.to_string())
                        }
                    };
                }

                // Finished tasks belong to earlier batches; wait for a live one.
                trace!(
                    instance = %proc_inst_id,
                    node = %node_id,
                    finished = tasks.len(),
                    "no unfinished task yet"
                );
            }
            Err(err) => {
                warn!(
                    instance = %proc_inst_id,
                    node = %node_id,
                    error = %err,
                    "task query failed while waiting for system task"
                );
            }
        }

        sleep(options.poll_interval).await;
    }
}
