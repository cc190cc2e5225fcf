//! Helpers shared by the session commands.

use crate::bundler::CommandBundler;
use crate::dev::{DevConfig, DevSession, SessionHandle};
use crate::error::Result;
use crate::ui;
use std::io::BufRead;
use tokio::signal;

/// Start a session with the configured bundler and run it until Ctrl+C.
pub(crate) async fn run_session(config: DevConfig) -> Result<()> {
    ui::info(&format!("Entry point: {}", config.base.entry));
    ui::info(&format!(
        "Working directory: {}",
        config.base.project_root().display()
    ));

    let bundler = CommandBundler::new(config.base.bundler.program.clone());
    let session = DevSession::start(config, bundler).await?;
    spawn_rebuild_listener(session.handle());

    ui::info("Press Ctrl+C to stop, type `rs` + Enter to rebuild");
    session
        .run(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::warn!(error = %e, "cannot listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await
}

/// Read `rs` lines from stdin and request rebuilds.
///
/// Runs on a detached OS thread: a blocking stdin read must not hold up
/// runtime shutdown.
fn spawn_rebuild_listener(handle: SessionHandle) {
    let spawned = std::thread::Builder::new()
        .name("kiln-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if is_rebuild_command(&line) && !handle.request_rebuild() {
                    break;
                }
            }
        });

    if let Err(e) = spawned {
        tracing::debug!(error = %e, "manual rebuild listener not started");
    }
}

fn is_rebuild_command(line: &str) -> bool {
    line.trim() == "rs"
}
