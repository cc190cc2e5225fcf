//! Build invocation and build hooks.
//!
//! [`BuildInvoker`] wraps a [`Bundler`]: the first rebuild establishes the
//! bundler's reusable context, later ones reuse it. `postBuild` hooks run after
//! every successful build; a failing hook turns the cycle into a failure so the
//! session skips notify/restart.

use crate::bundler::{BuildResult, BundleOptions, Bundler, Diagnostic};
use crate::config::KilnConfig;
use crate::error::{BuildError, KilnError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::OnceCell;

/// Shell commands run around builds, placeholders already substituted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hooks {
    pub pre_build: Vec<String>,
    pub post_build: Vec<String>,
    /// Directory the commands run in
    pub cwd: PathBuf,
}

impl Hooks {
    pub fn from_config(config: &KilnConfig) -> Self {
        Self {
            pre_build: config.pre_build.iter().map(|c| config.substitute(c)).collect(),
            post_build: config.post_build.iter().map(|c| config.substitute(c)).collect(),
            cwd: config.project_root(),
        }
    }
}

fn shell(command: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

/// Run one hook command through the platform shell.
///
/// # Errors
///
/// Returns [`KilnError::Hook`] if the shell cannot be started or the command
/// exits unsuccessfully
pub async fn run_hook(command: &str, cwd: &Path) -> Result<()> {
    tracing::debug!(command, "running hook");

    let status = shell(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|e| KilnError::Hook {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(KilnError::Hook {
            command: command.to_string(),
            reason: status.to_string(),
        })
    }
}

/// Run hook commands in order, stopping at the first failure.
pub async fn run_hooks(commands: &[String], cwd: &Path) -> Result<()> {
    for command in commands {
        run_hook(command, cwd).await?;
    }
    Ok(())
}

/// Issues builds to the bundler on behalf of a session or a one-shot build.
pub struct BuildInvoker<B: Bundler> {
    bundler: B,
    options: BundleOptions,
    hooks: Hooks,
    context: OnceCell<B::Context>,
}

impl<B: Bundler> BuildInvoker<B> {
    pub fn new(bundler: B, options: BundleOptions, hooks: Hooks) -> Self {
        Self {
            bundler,
            options,
            hooks,
            context: OnceCell::new(),
        }
    }

    pub fn from_config(bundler: B, config: &KilnConfig) -> Self {
        Self::new(
            bundler,
            BundleOptions::from_config(config),
            Hooks::from_config(config),
        )
    }

    pub fn options(&self) -> &BundleOptions {
        &self.options
    }

    /// Check the entry point exists.
    pub fn check_entry(&self) -> Result<()> {
        if self.options.entry.exists() {
            Ok(())
        } else {
            Err(BuildError::EntryNotFound(self.options.entry.clone()).into())
        }
    }

    /// Run `preBuild` hooks. A failure here aborts startup.
    pub async fn run_pre_build(&self) -> Result<()> {
        run_hooks(&self.hooks.pre_build, &self.hooks.cwd).await
    }

    /// One-shot build.
    pub async fn build(&self) -> BuildResult {
        let result = self.bundler.build(&self.options).await;
        self.finish(result).await
    }

    /// Build from the reusable context, preparing it on first use.
    ///
    /// A context that cannot be prepared is reported as a failed build and
    /// preparation is retried on the next call.
    pub async fn rebuild(&self) -> BuildResult {
        let context = match self
            .context
            .get_or_try_init(|| self.bundler.prepare(&self.options))
            .await
        {
            Ok(context) => context,
            Err(e) => {
                return BuildResult::failure(
                    vec![Diagnostic::error(format!("could not prepare bundler: {}", e))],
                    0,
                );
            }
        };

        let result = self.bundler.rebuild(context).await;
        self.finish(result).await
    }

    async fn finish(&self, mut result: BuildResult) -> BuildResult {
        if !result.ok {
            return result;
        }

        if let Err(e) = run_hooks(&self.hooks.post_build, &self.hooks.cwd).await {
            tracing::warn!(error = %e, "postBuild hook failed");
            result.ok = false;
            result.diagnostics.push(Diagnostic::error(e.to_string()));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::Severity;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeBundler {
        prepares: Arc<AtomicUsize>,
        rebuilds: Arc<AtomicUsize>,
        fail: Arc<AtomicBool>,
    }

    impl FakeBundler {
        fn outcome(&self) -> BuildResult {
            if self.fail.load(Ordering::SeqCst) {
                BuildResult::failure(vec![Diagnostic::error("syntax error")], 1)
            } else {
                BuildResult::success(vec![], 1)
            }
        }
    }

    #[async_trait]
    impl Bundler for FakeBundler {
        type Context = usize;

        async fn build(&self, _options: &BundleOptions) -> BuildResult {
            self.outcome()
        }

        async fn prepare(&self, _options: &BundleOptions) -> Result<Self::Context> {
            Ok(self.prepares.fetch_add(1, Ordering::SeqCst))
        }

        async fn rebuild(&self, _context: &Self::Context) -> BuildResult {
            self.rebuilds.fetch_add(1, Ordering::SeqCst);
            self.outcome()
        }
    }

    fn options(root: &Path) -> BundleOptions {
        let config = KilnConfig {
            cwd: Some(root.to_path_buf()),
            ..KilnConfig::default()
        };
        BundleOptions::from_config(&config)
    }

    fn hooks(root: &Path, post_build: &[&str]) -> Hooks {
        Hooks {
            pre_build: vec![],
            post_build: post_build.iter().map(|s| s.to_string()).collect(),
            cwd: root.to_path_buf(),
        }
    }

    #[test]
    fn test_hooks_substitute_placeholders() {
        let config = KilnConfig {
            cwd: Some(PathBuf::from("/p")),
            pre_build: vec!["rm -rf ${outdir}".to_string()],
            post_build: vec!["cp ${srcdir}/index.html ${outdir}".to_string()],
            ..KilnConfig::default()
        };
        let hooks = Hooks::from_config(&config);
        assert_eq!(hooks.pre_build, vec!["rm -rf /p/dist"]);
        assert_eq!(hooks.post_build, vec!["cp /p/src/index.html /p/dist"]);
        assert_eq!(hooks.cwd, PathBuf::from("/p"));
    }

    #[tokio::test]
    async fn test_rebuild_prepares_context_once() {
        let dir = tempfile::tempdir().unwrap();
        let bundler = FakeBundler::default();
        let prepares = Arc::clone(&bundler.prepares);
        let rebuilds = Arc::clone(&bundler.rebuilds);
        let invoker = BuildInvoker::new(bundler, options(dir.path()), hooks(dir.path(), &[]));

        assert!(invoker.rebuild().await.ok);
        assert!(invoker.rebuild().await.ok);
        assert_eq!(prepares.load(Ordering::SeqCst), 1);
        assert_eq!(rebuilds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_check_entry() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = BuildInvoker::new(
            FakeBundler::default(),
            options(dir.path()),
            hooks(dir.path(), &[]),
        );
        let err = invoker.check_entry().unwrap_err();
        assert!(matches!(err, KilnError::Build(BuildError::EntryNotFound(_))));

        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/index.ts"), "").unwrap();
        assert!(invoker.check_entry().is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_post_build_runs_on_success_only() {
        let dir = tempfile::tempdir().unwrap();
        let bundler = FakeBundler::default();
        let fail = Arc::clone(&bundler.fail);
        let invoker = BuildInvoker::new(
            bundler,
            options(dir.path()),
            hooks(dir.path(), &["touch marker"]),
        );

        fail.store(true, Ordering::SeqCst);
        let failed = invoker.build().await;
        assert!(!failed.ok);
        assert!(!dir.path().join("marker").exists());

        fail.store(false, Ordering::SeqCst);
        assert!(invoker.build().await.ok);
        assert!(dir.path().join("marker").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_post_build_marks_cycle_failed() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = BuildInvoker::new(
            FakeBundler::default(),
            options(dir.path()),
            hooks(dir.path(), &["exit 3"]),
        );

        let result = invoker.build().await;
        assert!(!result.ok);
        let last = result.diagnostics.last().unwrap();
        assert_eq!(last.severity, Severity::Error);
        assert!(last.message.contains("exit 3"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hooks_stop_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let commands = vec![
            "false".to_string(),
            "touch never".to_string(),
        ];

        let err = run_hooks(&commands, dir.path()).await.unwrap_err();
        assert!(matches!(err, KilnError::Hook { ref command, .. } if command == "false"));
        assert!(!dir.path().join("never").exists());
    }
}
