//! The dev session: one task that owns every component.
//!
//! Watcher callbacks, socket tasks, build tasks and process wait tasks only
//! send messages into the session's inbox. The loop in [`DevSession::run`] is
//! the single place where the hub, the debounce timers, the build bookkeeping
//! and the supervisor slot change.

use crate::bundler::{BuildResult, Bundler, Severity};
use crate::dev::builder::BuildInvoker;
use crate::dev::config::{DevConfig, DevTarget};
use crate::dev::debounce::{Concern, Debouncer};
use crate::dev::hub::{ClientEvent, ClientId, ClientRegistrar, ReloadHub, ReloadMessage};
use crate::dev::server::{DevServer, ServerState};
use crate::dev::state::{StatusBoard, StatusSnapshot};
use crate::dev::supervisor::{ProcessEvent, ProcessSupervisor};
use crate::dev::watcher::{ChangeDetector, IgnoreRules, WatchSignal};
use crate::dev::SharedStatus;
use crate::error::Result;
use crate::ui;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// How long teardown waits for the HTTP server to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Requests accepted from outside the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Rebuild now, bypassing the watcher
    Rebuild,
    /// Stop the session
    Shutdown,
}

/// Cloneable handle for talking to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    clients: ClientRegistrar,
    status: SharedStatus,
}

impl SessionHandle {
    /// Ask for a rebuild. Usable from any thread; returns `false` if the
    /// session is gone or its command queue is full.
    pub fn request_rebuild(&self) -> bool {
        self.commands.try_send(SessionCommand::Rebuild).is_ok()
    }

    /// Ask the session to stop.
    pub fn shutdown(&self) -> bool {
        self.commands.try_send(SessionCommand::Shutdown).is_ok()
    }

    /// Register a live reload client without a socket.
    pub async fn connect_client(&self) -> Option<(ClientId, mpsc::Receiver<ReloadMessage>)> {
        self.clients.connect().await
    }

    pub async fn disconnect_client(&self, id: ClientId) {
        self.clients.disconnect(id).await;
    }

    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildTrigger {
    Initial,
    Change,
    Manual,
}

#[derive(Debug)]
struct BuildOutcome {
    generation: u64,
    trigger: BuildTrigger,
    result: BuildResult,
}

enum LoopEvent {
    Watch(Option<WatchSignal>),
    Fired(Concern),
    Built(BuildOutcome),
    Client(ClientEvent),
    Process(ProcessEvent),
    Command(SessionCommand),
    Shutdown,
}

/// Receiving ends of every channel feeding the loop.
struct Inbox {
    signals: ReceiverStream<WatchSignal>,
    builds: mpsc::Receiver<BuildOutcome>,
    clients: mpsc::Receiver<ClientEvent>,
    processes: mpsc::Receiver<ProcessEvent>,
    commands: mpsc::Receiver<SessionCommand>,
}

/// State mutated by the loop.
struct SessionCore<B: Bundler> {
    config: DevConfig,
    invoker: Arc<BuildInvoker<B>>,
    scheduler: Debouncer<Concern>,
    hub: ReloadHub,
    supervisor: Option<ProcessSupervisor>,
    status: SharedStatus,
    build_tx: mpsc::Sender<BuildOutcome>,
    generation: u64,
    building: Option<u64>,
    rebuild_queued: bool,
    auto_rebuild: bool,
}

/// A running development session.
pub struct DevSession<B: Bundler> {
    core: SessionCore<B>,
    inbox: Inbox,
    server: Option<DevServer>,
    server_addr: Option<SocketAddr>,
    detector: ChangeDetector,
    handle: SessionHandle,
    // Held so the process channel outlives any one supervisor instance
    _process_tx: mpsc::Sender<ProcessEvent>,
}

impl<B: Bundler> DevSession<B> {
    /// Prepare a session: run `preBuild` hooks, bind the server and start
    /// watching.
    ///
    /// # Errors
    ///
    /// Startup failures only: a failing hook, an unavailable address, a
    /// watcher that cannot be created
    pub async fn start(config: DevConfig, bundler: B) -> Result<Self> {
        let invoker = Arc::new(BuildInvoker::from_config(bundler, &config.base));
        invoker.run_pre_build().await?;

        let status: SharedStatus = Arc::new(StatusBoard::new());
        let (build_tx, builds) = mpsc::channel(4);
        let (client_tx, clients) = mpsc::channel(64);
        let (process_tx, processes) = mpsc::channel(8);
        let (command_tx, commands) = mpsc::channel(8);
        let registrar = ClientRegistrar::new(client_tx);

        let (server, supervisor) = match &config.target {
            DevTarget::Serve { addr } => {
                let state = ServerState {
                    root: config.base.out_path(),
                    default_document: config.base.server.default_document.clone(),
                    live_reload: config.base.server.live_reload,
                    clients: registrar.clone(),
                    status: Arc::clone(&status),
                };
                (Some(DevServer::bind(*addr, state).await?), None)
            }
            DevTarget::Supervise { command } => (
                None,
                Some(ProcessSupervisor::new(command.clone(), process_tx.clone())),
            ),
        };
        let server_addr = match &server {
            Some(server) => Some(server.local_addr()?),
            None => None,
        };

        let rules = IgnoreRules::from_config(&config.base);
        let roots = rules.roots().to_vec();
        let (detector, signals) = ChangeDetector::start(roots, rules)?;

        let handle = SessionHandle {
            commands: command_tx,
            clients: registrar,
            status: Arc::clone(&status),
        };

        Ok(Self {
            core: SessionCore {
                scheduler: Debouncer::for_session(&config.base.debounce),
                config,
                invoker,
                hub: ReloadHub::new(),
                supervisor,
                status,
                build_tx,
                generation: 0,
                building: None,
                rebuild_queued: false,
                auto_rebuild: true,
            },
            inbox: Inbox {
                signals,
                builds,
                clients,
                processes,
                commands,
            },
            server,
            server_addr,
            detector,
            handle,
            _process_tx: process_tx,
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Address the dev server actually bound, when serving.
    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server_addr
    }

    /// Run until `shutdown` resolves or a [`SessionCommand::Shutdown`]
    /// arrives, then tear everything down.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let Self {
            mut core,
            mut inbox,
            server,
            server_addr,
            detector,
            ..
        } = self;

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server_task = server.map(|server| {
            tokio::spawn(server.serve(async move {
                let _ = stop_rx.await;
            }))
        });

        if let Some(addr) = server_addr {
            ui::success(&format!("Development server running at http://{}", addr));
        }
        for root in detector.roots() {
            ui::info(&format!("Watching {}", root.display()));
        }

        core.start_build(BuildTrigger::Initial);

        tokio::pin!(shutdown);
        loop {
            let event = tokio::select! {
                signal = inbox.signals.next(), if core.auto_rebuild => LoopEvent::Watch(signal),
                concern = core.scheduler.fired() => LoopEvent::Fired(concern),
                Some(outcome) = inbox.builds.recv() => LoopEvent::Built(outcome),
                Some(client) = inbox.clients.recv() => LoopEvent::Client(client),
                Some(event) = inbox.processes.recv() => LoopEvent::Process(event),
                Some(command) = inbox.commands.recv() => LoopEvent::Command(command),
                _ = &mut shutdown => LoopEvent::Shutdown,
            };

            if !core.handle(event) {
                break;
            }
        }

        core.teardown();
        drop(detector);
        // Late build results and socket goodbyes have nowhere to go now
        drop(inbox);

        let _ = stop_tx.send(());
        if let Some(task) = server_task {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => tracing::warn!(error = %e, "server stopped with error"),
                Ok(Err(e)) => tracing::warn!(error = %e, "server task failed"),
                Err(_) => tracing::debug!("server did not drain in time"),
            }
        }

        ui::success("Development session stopped");
        Ok(())
    }
}

impl<B: Bundler> SessionCore<B> {
    fn serving(&self) -> bool {
        matches!(self.config.target, DevTarget::Serve { .. })
    }

    fn live_reload(&self) -> bool {
        self.serving() && self.config.base.server.live_reload
    }

    /// Apply one event. Returns `false` when the session should stop.
    fn handle(&mut self, event: LoopEvent) -> bool {
        match event {
            LoopEvent::Watch(Some(signal)) => self.on_watch_signal(signal),
            LoopEvent::Watch(None) => self.disable_auto_rebuild("the watcher stopped"),
            LoopEvent::Fired(Concern::Rebuild) => self.request_build(BuildTrigger::Change),
            LoopEvent::Fired(Concern::Broadcast) => self.flush_clients(),
            LoopEvent::Built(outcome) => self.on_build_complete(outcome),
            LoopEvent::Client(ClientEvent::Connected { id, sender }) => {
                self.hub.register_client(id, sender);
                self.status.set_clients(self.hub.client_count());
                self.scheduler.notify(Concern::Broadcast);
            }
            LoopEvent::Client(ClientEvent::Disconnected { id }) => {
                self.hub.unregister_client(id);
                self.status.set_clients(self.hub.client_count());
            }
            LoopEvent::Process(event) => {
                if let Some(supervisor) = self.supervisor.as_mut() {
                    supervisor.handle_event(event);
                }
            }
            LoopEvent::Command(SessionCommand::Rebuild) => {
                ui::info("Rebuilding...");
                self.request_build(BuildTrigger::Manual);
            }
            LoopEvent::Command(SessionCommand::Shutdown) | LoopEvent::Shutdown => {
                ui::info("Shutting down...");
                return false;
            }
        }
        true
    }

    fn on_watch_signal(&mut self, signal: WatchSignal) {
        match signal {
            WatchSignal::Ready => tracing::debug!("watcher ready"),
            WatchSignal::Change(change) => {
                tracing::debug!(path = %change.path.display(), kind = ?change.kind, "change");
                if self.live_reload() {
                    self.hub.record_change(change.path);
                }
                self.scheduler.notify(Concern::Rebuild);
            }
            WatchSignal::Error(message) => {
                tracing::warn!(error = %message, "watcher error");
                self.disable_auto_rebuild(&message);
            }
        }
    }

    fn disable_auto_rebuild(&mut self, reason: &str) {
        if !self.auto_rebuild {
            return;
        }
        self.auto_rebuild = false;
        ui::warning(&format!(
            "File watching stopped ({}); type `rs` + Enter to rebuild manually",
            reason
        ));
    }

    fn request_build(&mut self, trigger: BuildTrigger) {
        if self.building.is_some() {
            tracing::debug!("build in progress, queueing another");
            self.rebuild_queued = true;
            return;
        }
        self.start_build(trigger);
    }

    fn start_build(&mut self, trigger: BuildTrigger) {
        self.generation += 1;
        let generation = self.generation;
        self.building = Some(generation);
        self.status.start_build();

        let invoker = Arc::clone(&self.invoker);
        let tx = self.build_tx.clone();
        tokio::spawn(async move {
            let result = invoker.rebuild().await;
            // Receiver gone: the session ended while building
            let _ = tx
                .send(BuildOutcome {
                    generation,
                    trigger,
                    result,
                })
                .await;
        });
    }

    fn on_build_complete(&mut self, outcome: BuildOutcome) {
        if self.building != Some(outcome.generation) {
            tracing::debug!(generation = outcome.generation, "discarding stale build result");
            return;
        }
        self.building = None;

        let BuildOutcome {
            trigger, result, ..
        } = outcome;

        if result.ok {
            self.status.complete_build(result.duration_ms);
            let label = if trigger == BuildTrigger::Initial {
                "Built"
            } else {
                "Rebuilt"
            };
            ui::success(&format!(
                "{} in {}",
                label,
                ui::format_duration(Duration::from_millis(result.duration_ms))
            ));
            ui::print_diagnostics(&result.diagnostics);

            if self.live_reload() && trigger != BuildTrigger::Initial {
                self.hub.complete_build();
                self.scheduler.notify(Concern::Broadcast);
            }

            if let Some(supervisor) = self.supervisor.as_mut() {
                if trigger == BuildTrigger::Initial {
                    supervisor.ensure_running();
                } else {
                    supervisor.restart();
                }
            }
        } else {
            let error = result
                .diagnostics
                .iter()
                .find(|d| d.severity == Severity::Error)
                .map(|d| d.message.clone())
                .unwrap_or_else(|| "build failed".to_string());
            self.status.fail_build(error);
            ui::error("Build failed; keeping the previous output");
            ui::print_diagnostics(&result.diagnostics);
        }

        if std::mem::take(&mut self.rebuild_queued) {
            self.start_build(BuildTrigger::Change);
        }
    }

    fn flush_clients(&mut self) {
        let report = self.hub.flush();
        if let Some(message) = report.broadcast {
            tracing::info!(
                message = message.as_str(),
                clients = self.hub.client_count(),
                "notified clients"
            );
        }
        if report.removed > 0 {
            self.status.set_clients(self.hub.client_count());
        }
        // Acknowledgements that hit a full queue get another try
        if self.hub.has_unacknowledged() {
            self.scheduler.notify(Concern::Broadcast);
        }
    }

    fn teardown(&mut self) {
        self.scheduler.cancel_all();
        self.hub.close_all();
        self.status.set_clients(0);
        if let Some(supervisor) = self.supervisor.as_mut() {
            supervisor.shutdown();
        }
        if self.building.take().is_some() {
            tracing::debug!("discarding the build still in flight");
        }
    }
}
