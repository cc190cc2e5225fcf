//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use kiln::bundler::{BuildResult, BundleOptions, Bundler, Diagnostic};
use kiln::config::KilnConfig;
use kiln::dev::ReloadMessage;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration, Instant};

/// Upper bound for anything that involves the file watcher.
pub const WAIT: Duration = Duration::from_secs(10);

/// Bundler that writes a numbered `index.html` plus `index.js` and
/// `styles.css`, or fails while `fail` is set.
///
/// `started` counts bundles begun; `builds` counts bundles finished, after
/// `delay_ms` has passed.
#[derive(Clone, Default)]
pub struct FakeBundler {
    pub started: Arc<AtomicUsize>,
    pub builds: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
    pub delay_ms: Arc<AtomicU64>,
}

impl FakeBundler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every bundle takes `ms` milliseconds.
    pub fn slow(ms: u64) -> Self {
        let bundler = Self::default();
        bundler.delay_ms.store(ms, Ordering::SeqCst);
        bundler
    }

    async fn bundle(&self, out_dir: &Path) -> BuildResult {
        self.started.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            sleep(Duration::from_millis(delay)).await;
        }
        self.emit(out_dir)
    }

    fn emit(&self, out_dir: &Path) -> BuildResult {
        let n = self.builds.fetch_add(1, Ordering::SeqCst) + 1;

        if self.fail.load(Ordering::SeqCst) {
            return BuildResult::failure(
                vec![Diagnostic::error("src/index.ts:1:1: Unexpected token")],
                1,
            );
        }

        fs::create_dir_all(out_dir).unwrap();
        fs::write(
            out_dir.join("index.html"),
            format!("<html><body>build {}</body></html>", n),
        )
        .unwrap();
        fs::write(out_dir.join("index.js"), format!("console.log({});", n)).unwrap();
        fs::write(out_dir.join("styles.css"), "body {}").unwrap();

        BuildResult::success(vec![], 1)
    }
}

#[async_trait]
impl Bundler for FakeBundler {
    type Context = BundleOptions;

    async fn build(&self, options: &BundleOptions) -> BuildResult {
        self.bundle(&options.out_dir).await
    }

    async fn prepare(&self, options: &BundleOptions) -> kiln::Result<BundleOptions> {
        Ok(options.clone())
    }

    async fn rebuild(&self, context: &BundleOptions) -> BuildResult {
        self.bundle(&context.out_dir).await
    }
}

/// A throwaway project with `src/index.ts` and `src/styles.css`.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/index.ts"), "export const x = 1;").unwrap();
        fs::write(dir.path().join("src/styles.css"), "body { color: black }").unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("dist")
    }

    /// Serving on an ephemeral port with short quiet windows.
    pub fn config(&self) -> KilnConfig {
        let mut config = KilnConfig {
            cwd: Some(self.dir.path().to_path_buf()),
            ..KilnConfig::default()
        };
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.debounce.rebuild_ms = 50;
        config.debounce.reload_ms = 50;
        config
    }

    pub fn write(&self, relative: &str, content: &str) {
        fs::write(self.dir.path().join(relative), content).unwrap();
    }
}

/// Poll `condition` until it holds or `WAIT` elapses.
pub async fn wait_for(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(20)).await;
    }
    condition()
}

/// Next message for a client, `None` on timeout or a closed queue.
pub async fn next_message(rx: &mut mpsc::Receiver<ReloadMessage>) -> Option<ReloadMessage> {
    timeout(WAIT, rx.recv()).await.ok().flatten()
}

/// Assert nothing arrives for a while.
pub async fn assert_quiet(rx: &mut mpsc::Receiver<ReloadMessage>) {
    let message = timeout(Duration::from_millis(400), rx.recv()).await;
    assert!(message.is_err(), "unexpected message: {:?}", message);
}
