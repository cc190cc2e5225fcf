//! Live reload client registry and batch fan-out.
//!
//! The hub is owned by the session task; nothing else touches it. WebSocket
//! tasks only hold the receiving half of their client's channel.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identifier of one connected client.
pub type ClientId = usize;

/// Capacity of each client's outgoing queue.
pub const CLIENT_QUEUE: usize = 16;

/// Extensions a stylesheet refresh can pick up without a full reload.
pub const COSMETIC_EXTENSIONS: &[&str] = &[
    "css", "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico", "bmp", "woff", "woff2",
    "ttf", "otf", "eot",
];

/// Message pushed to a browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadMessage {
    /// Acknowledges a new connection
    Connected,
    /// Reload the page
    Reload,
    /// Re-fetch stylesheets only
    RefreshCss,
}

impl ReloadMessage {
    /// Text frame carried over the socket.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReloadMessage::Connected => "connected",
            ReloadMessage::Reload => "reload",
            ReloadMessage::RefreshCss => "refreshcss",
        }
    }
}

/// Connection lifecycle reported to the session.
#[derive(Debug)]
pub enum ClientEvent {
    Connected {
        id: ClientId,
        sender: mpsc::Sender<ReloadMessage>,
    },
    Disconnected {
        id: ClientId,
    },
}

/// Hands out client ids and announces connections to the session loop.
#[derive(Debug, Clone)]
pub struct ClientRegistrar {
    events: mpsc::Sender<ClientEvent>,
    next_id: Arc<AtomicUsize>,
}

impl ClientRegistrar {
    pub fn new(events: mpsc::Sender<ClientEvent>) -> Self {
        Self {
            events,
            next_id: Arc::new(AtomicUsize::new(1)),
        }
    }

    /// Announce a new client. `None` once the session has stopped.
    pub async fn connect(&self) -> Option<(ClientId, mpsc::Receiver<ReloadMessage>)> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(CLIENT_QUEUE);
        self.events
            .send(ClientEvent::Connected { id, sender })
            .await
            .ok()?;
        Some((id, receiver))
    }

    pub async fn disconnect(&self, id: ClientId) {
        let _ = self.events.send(ClientEvent::Disconnected { id }).await;
    }
}

#[derive(Debug)]
struct Client {
    sender: mpsc::Sender<ReloadMessage>,
    acknowledged: bool,
}

/// Pick the message for a completed batch of changed paths.
///
/// `refreshcss` only when every path is cosmetic; an empty batch reloads.
pub fn classify_batch<'a, I>(paths: I) -> ReloadMessage
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut any = false;
    for path in paths {
        any = true;
        if !is_cosmetic(path) {
            return ReloadMessage::Reload;
        }
    }

    if any {
        ReloadMessage::RefreshCss
    } else {
        ReloadMessage::Reload
    }
}

fn is_cosmetic(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            COSMETIC_EXTENSIONS
                .iter()
                .any(|c| c.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// What a [`ReloadHub::flush`] delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Clients that received their `connected` acknowledgement
    pub acknowledged: usize,
    /// Batch message sent, if a built batch was pending
    pub broadcast: Option<ReloadMessage>,
    /// Clients dropped because their socket is gone
    pub removed: usize,
}

/// Connected clients plus the batch of changes not yet announced.
#[derive(Debug, Default)]
pub struct ReloadHub {
    clients: HashMap<ClientId, Client>,
    batch: BTreeSet<PathBuf>,
    batch_built: bool,
}

impl ReloadHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client. It stays unacknowledged until the next flush.
    pub fn register_client(&mut self, id: ClientId, sender: mpsc::Sender<ReloadMessage>) {
        tracing::debug!(client = id, "live reload client connected");
        self.clients.insert(
            id,
            Client {
                sender,
                acknowledged: false,
            },
        );
    }

    /// Remove a client.
    pub fn unregister_client(&mut self, id: ClientId) -> bool {
        let removed = self.clients.remove(&id).is_some();
        if removed {
            tracing::debug!(client = id, "live reload client disconnected");
        }
        removed
    }

    /// Get number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Add a changed path to the pending batch.
    pub fn record_change(&mut self, path: PathBuf) {
        self.batch.insert(path);
    }

    /// Mark the pending batch as built. Called on successful builds only;
    /// after a failure the batch waits for the next good build.
    pub fn complete_build(&mut self) {
        self.batch_built = true;
    }

    /// Whether any client still waits for its acknowledgement.
    pub fn has_unacknowledged(&self) -> bool {
        self.clients.values().any(|c| !c.acknowledged)
    }

    /// Deliver acknowledgements, then the built batch.
    ///
    /// Sends go over a snapshot of the client ids. Clients whose channel is
    /// closed are removed after the loop, so one dead socket never costs
    /// another client its message.
    pub fn flush(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        let mut failed_ids = Vec::new();

        let ids: Vec<ClientId> = self.clients.keys().copied().collect();

        for id in &ids {
            let Some(client) = self.clients.get_mut(id) else {
                continue;
            };
            if client.acknowledged {
                continue;
            }
            match client.sender.try_send(ReloadMessage::Connected) {
                Ok(()) => {
                    client.acknowledged = true;
                    report.acknowledged += 1;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => failed_ids.push(*id),
                // Retried on the next flush; the client has seen nothing yet
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(client = id, "client queue full, acknowledgement deferred");
                }
            }
        }

        if self.batch_built {
            let message = classify_batch(self.batch.iter().map(PathBuf::as_path));
            tracing::debug!(
                message = message.as_str(),
                changes = self.batch.len(),
                clients = ids.len(),
                "broadcasting"
            );

            for id in &ids {
                if failed_ids.contains(id) {
                    continue;
                }
                let Some(client) = self.clients.get(id) else {
                    continue;
                };
                if !client.acknowledged {
                    continue;
                }
                match client.sender.try_send(message) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Closed(_)) => failed_ids.push(*id),
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(client = id, "client queue full, dropping {}", message.as_str());
                    }
                }
            }

            self.batch.clear();
            self.batch_built = false;
            report.broadcast = Some(message);
        }

        for id in failed_ids {
            if self.clients.remove(&id).is_some() {
                report.removed += 1;
            }
        }

        report
    }

    /// Drop every client, closing their channels.
    pub fn close_all(&mut self) {
        self.clients.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(hub: &mut ReloadHub, id: ClientId) -> mpsc::Receiver<ReloadMessage> {
        let (tx, rx) = mpsc::channel(CLIENT_QUEUE);
        hub.register_client(id, tx);
        rx
    }

    fn drain(rx: &mut mpsc::Receiver<ReloadMessage>) -> Vec<ReloadMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_wire_vocabulary() {
        assert_eq!(ReloadMessage::Connected.as_str(), "connected");
        assert_eq!(ReloadMessage::Reload.as_str(), "reload");
        assert_eq!(ReloadMessage::RefreshCss.as_str(), "refreshcss");
    }

    #[test]
    fn test_classify_batch() {
        let css = [Path::new("a/site.css"), Path::new("img/logo.PNG")];
        assert_eq!(classify_batch(css), ReloadMessage::RefreshCss);

        let mixed = [Path::new("a/site.css"), Path::new("a/app.js")];
        assert_eq!(classify_batch(mixed), ReloadMessage::Reload);

        assert_eq!(classify_batch(std::iter::empty()), ReloadMessage::Reload);
        assert_eq!(classify_batch([Path::new("Makefile")]), ReloadMessage::Reload);
    }

    #[test]
    fn test_connected_precedes_batch() {
        let mut hub = ReloadHub::new();
        let mut early = client(&mut hub, 1);

        // First flush only acknowledges
        let report = hub.flush();
        assert_eq!(report.acknowledged, 1);
        assert_eq!(report.broadcast, None);

        hub.record_change(PathBuf::from("src/app.ts"));
        // Joins mid-debounce
        let mut late = client(&mut hub, 2);
        hub.complete_build();
        let report = hub.flush();
        assert_eq!(report.acknowledged, 1);
        assert_eq!(report.broadcast, Some(ReloadMessage::Reload));

        assert_eq!(
            drain(&mut early),
            vec![ReloadMessage::Connected, ReloadMessage::Reload]
        );
        assert_eq!(
            drain(&mut late),
            vec![ReloadMessage::Connected, ReloadMessage::Reload]
        );

        // Nothing pending: a further flush is silent
        assert_eq!(hub.flush(), FlushReport::default());
        assert!(drain(&mut early).is_empty());
    }

    #[test]
    fn test_css_only_batch_refreshes_styles() {
        let mut hub = ReloadHub::new();
        let mut rx = client(&mut hub, 1);
        hub.flush();

        hub.record_change(PathBuf::from("src/site.css"));
        hub.record_change(PathBuf::from("src/theme.css"));
        hub.complete_build();
        hub.flush();

        assert_eq!(
            drain(&mut rx),
            vec![ReloadMessage::Connected, ReloadMessage::RefreshCss]
        );
    }

    #[test]
    fn test_failed_build_keeps_batch() {
        let mut hub = ReloadHub::new();
        let mut rx = client(&mut hub, 1);
        hub.flush();

        hub.record_change(PathBuf::from("src/app.ts"));
        // Build failed: no complete_build
        assert_eq!(hub.flush().broadcast, None);

        hub.record_change(PathBuf::from("src/site.css"));
        hub.complete_build();
        assert_eq!(hub.flush().broadcast, Some(ReloadMessage::Reload));
        assert_eq!(
            drain(&mut rx),
            vec![ReloadMessage::Connected, ReloadMessage::Reload]
        );
    }

    #[test]
    fn test_closed_client_removed_without_affecting_others() {
        let mut hub = ReloadHub::new();
        let mut alive = client(&mut hub, 1);
        let gone = client(&mut hub, 2);
        let mut also_alive = client(&mut hub, 3);
        hub.flush();
        drop(gone);

        hub.complete_build();
        let report = hub.flush();

        assert_eq!(report.removed, 1);
        assert_eq!(hub.client_count(), 2);
        assert_eq!(drain(&mut alive).last(), Some(&ReloadMessage::Reload));
        assert_eq!(drain(&mut also_alive).last(), Some(&ReloadMessage::Reload));
    }

    #[test]
    fn test_full_queue_defers_acknowledgement() {
        let mut hub = ReloadHub::new();
        let (tx, mut rx) = mpsc::channel(1);
        tx.try_send(ReloadMessage::Reload).unwrap();
        hub.register_client(7, tx);

        assert_eq!(hub.flush().acknowledged, 0);
        assert!(hub.has_unacknowledged());

        assert_eq!(rx.try_recv().unwrap(), ReloadMessage::Reload);
        assert_eq!(hub.flush().acknowledged, 1);
        assert_eq!(rx.try_recv().unwrap(), ReloadMessage::Connected);
    }

    #[tokio::test]
    async fn test_registrar_assigns_distinct_ids() {
        let (tx, mut rx) = mpsc::channel(4);
        let registrar = ClientRegistrar::new(tx);

        let (first, _a) = registrar.connect().await.unwrap();
        let (second, _b) = registrar.clone().connect().await.unwrap();
        assert_ne!(first, second);

        registrar.disconnect(first).await;
        assert!(matches!(rx.recv().await, Some(ClientEvent::Connected { id, .. }) if id == first));
        assert!(matches!(rx.recv().await, Some(ClientEvent::Connected { id, .. }) if id == second));
        assert!(matches!(rx.recv().await, Some(ClientEvent::Disconnected { id }) if id == first));

        drop(rx);
        assert!(registrar.connect().await.is_none());
    }

    #[test]
    fn test_unregister() {
        let mut hub = ReloadHub::new();
        let _rx = client(&mut hub, 4);
        assert!(hub.unregister_client(4));
        assert!(!hub.unregister_client(4));
        assert_eq!(hub.client_count(), 0);
    }
}
