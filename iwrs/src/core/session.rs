//! The task that owns the object graph.
//!
//! Bus events and foreground requests reach the [`StatusGraph`] only through
//! the command channel of this task, so every mutation (and every wait-handle
//! creation) is serialized without locks. Commands are handled one at a time
//! and never suspend; callers await replies, then await wait-handles outside
//! the task.

use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};

use crate::api::models::{IwdError, ManagedObjects, StationState};
use crate::core::graph::StatusGraph;
use crate::core::router::ObjectEvent;
use crate::core::state_wait::{Wait, WaitKind, WaitTicket};
use crate::Result;

type Reply<T> = oneshot::Sender<Result<T>>;
type Inspector = Box<dyn FnOnce(&StatusGraph) + Send>;

enum Command {
    Event {
        event: ObjectEvent,
        reply: Option<Reply<()>>,
    },
    Resync {
        objects: ManagedObjects,
        reply: Reply<Vec<String>>,
    },
    BeginScan {
        device: String,
        reply: Reply<Wait<()>>,
    },
    BeginConnect {
        device: String,
        network: String,
        reply: Reply<(String, Wait<StationState>)>,
    },
    BeginStateWait {
        device: String,
        reply: Reply<Wait<bool>>,
    },
    Abandon {
        device: String,
        kind: WaitKind,
        ticket: WaitTicket,
    },
    Inspect(Inspector),
}

/// Cloneable handle to the graph task.
#[derive(Debug, Clone)]
pub(crate) struct SessionHandle {
    tx: mpsc::UnboundedSender<Command>,
}

/// Spawns the graph task on the current tokio runtime.
pub(crate) fn spawn_session() -> SessionHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run(StatusGraph::default(), rx));
    SessionHandle { tx }
}

async fn run(mut graph: StatusGraph, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(cmd) = rx.recv().await {
        handle(&mut graph, cmd);
    }
    debug!("Object graph session closed");
}

fn handle(graph: &mut StatusGraph, cmd: Command) {
    match cmd {
        Command::Event { event, reply } => {
            let result = graph.route(&event);
            match reply {
                Some(reply) => {
                    let _ = reply.send(result);
                }
                None => {
                    if let Err(e) = result {
                        warn!("Failed to apply event for {}: {e}", event.path());
                    }
                }
            }
        }
        Command::Resync { objects, reply } => {
            let result = graph
                .bulk_replace(&objects)
                .map(|()| graph.devices().map(|d| d.path.clone()).collect());
            let _ = reply.send(result);
        }
        Command::BeginScan { device, reply } => {
            let result = graph
                .find_device_by_path_mut(&device)
                .map(|d| d.waits.scan_terminated.begin());
            let _ = reply.send(result);
        }
        Command::BeginConnect {
            device,
            network,
            reply,
        } => {
            let result = graph.find_device_by_path_mut(&device).and_then(|d| {
                let path = d
                    .network_by_name(&network)
                    .map(|n| n.path.clone())
                    .ok_or_else(|| IwdError::NotFound(network.clone()))?;
                Ok((path, d.waits.connect_outcome.begin()))
            });
            let _ = reply.send(result);
        }
        Command::BeginStateWait { device, reply } => {
            let result = graph
                .find_device_by_path_mut(&device)
                .map(|d| d.waits.state_changed.begin());
            let _ = reply.send(result);
        }
        Command::Abandon {
            device,
            kind,
            ticket,
        } => {
            let dropped = graph
                .find_device_by_path_mut(&device)
                .is_ok_and(|d| d.waits.abandon(kind, ticket));
            if !dropped {
                debug!("Wait {ticket:?} on {device} already settled, nothing to abandon");
            }
        }
        Command::Inspect(f) => f(graph),
    }
}

impl SessionHandle {
    fn send(&self, cmd: Command) -> Result<()> {
        self.tx.send(cmd).map_err(|_| IwdError::SessionClosed)
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx))?;
        rx.await.map_err(|_| IwdError::SessionClosed)?
    }

    /// Applies an event and returns the routing result.
    pub(crate) async fn dispatch(&self, event: ObjectEvent) -> Result<()> {
        self.request(|reply| Command::Event {
            event,
            reply: Some(reply),
        })
        .await
    }

    /// Queues an event; routing failures are only logged.
    pub(crate) fn notify(&self, event: ObjectEvent) -> Result<()> {
        self.send(Command::Event { event, reply: None })
    }

    /// Rebuilds the graph and returns the paths of all devices.
    pub(crate) async fn resync(&self, objects: ManagedObjects) -> Result<Vec<String>> {
        self.request(|reply| Command::Resync { objects, reply }).await
    }

    pub(crate) async fn begin_scan(&self, device: &str) -> Result<Wait<()>> {
        self.request(|reply| Command::BeginScan {
            device: device.to_string(),
            reply,
        })
        .await
    }

    /// Resolves `network` by name on `device` and begins a connect wait.
    ///
    /// Returns the network's object path with the wait.
    pub(crate) async fn begin_connect(
        &self,
        device: &str,
        network: &str,
    ) -> Result<(String, Wait<StationState>)> {
        self.request(|reply| Command::BeginConnect {
            device: device.to_string(),
            network: network.to_string(),
            reply,
        })
        .await
    }

    pub(crate) async fn begin_state_wait(&self, device: &str) -> Result<Wait<bool>> {
        self.request(|reply| Command::BeginStateWait {
            device: device.to_string(),
            reply,
        })
        .await
    }

    /// Drops the wait `ticket` was issued for, so the next caller issues a
    /// fresh request. A newer wait in the same slot is left pending.
    pub(crate) fn abandon(&self, device: &str, kind: WaitKind, ticket: WaitTicket) {
        let cmd = Command::Abandon {
            device: device.to_string(),
            kind,
            ticket,
        };
        if self.send(cmd).is_err() {
            debug!("Session closed while abandoning wait on {device}");
        }
    }

    /// Runs `f` against the graph inside the task and returns its result.
    pub(crate) async fn inspect<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&StatusGraph) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Inspect(Box::new(move |graph| {
            let _ = tx.send(f(graph));
        })))?;
        rx.await.map_err(|_| IwdError::SessionClosed)
    }
}
