//! esbuild-compatible command-line bundler.

use super::{BuildResult, BundleOptions, Bundler, Diagnostic, Severity};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// Drives an external bundler executable (`esbuild` by default).
#[derive(Debug, Clone)]
pub struct CommandBundler {
    program: String,
}

/// Prepared invocation reused by every rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl CommandBundler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Translate options into command-line arguments.
    ///
    /// Every flag is keyed by its name; an `override` entry with the same name
    /// replaces the generated flag instead of being appended next to it.
    pub fn args(options: &BundleOptions) -> Vec<String> {
        let mut flags: Vec<(String, Vec<String>)> = vec![
            ("bundle".to_string(), vec!["--bundle".to_string()]),
            (
                "outdir".to_string(),
                vec![format!("--outdir={}", options.out_dir.display())],
            ),
            (
                "platform".to_string(),
                vec![format!("--platform={}", options.platform.as_str())],
            ),
            (
                "target".to_string(),
                vec![format!("--target={}", options.target)],
            ),
        ];

        if options.minify {
            flags.push(("minify".to_string(), vec!["--minify".to_string()]));
        }
        if options.sourcemap {
            flags.push(("sourcemap".to_string(), vec!["--sourcemap".to_string()]));
        }
        if !options.external.is_empty() {
            flags.push((
                "external".to_string(),
                options
                    .external
                    .iter()
                    .map(|m| format!("--external:{}", m))
                    .collect(),
            ));
        }

        for (key, value) in &options.overrides {
            flags.retain(|(name, _)| name != key);
            flags.push((key.clone(), override_args(key, value)));
        }

        let mut args = vec![options.entry.display().to_string()];
        args.extend(flags.into_iter().flat_map(|(_, rendered)| rendered));
        args
    }

    async fn invoke(&self, args: &[String], cwd: &Path) -> BuildResult {
        let start = Instant::now();
        tracing::debug!(program = %self.program, ?args, "invoking bundler");

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let elapsed = start.elapsed().as_millis() as u64;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                return BuildResult::failure(
                    vec![Diagnostic::error(format!(
                        "bundler `{}` could not be started: {}",
                        self.program, e
                    ))],
                    elapsed,
                );
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut diagnostics = parse_diagnostics(&stderr);

        if output.status.success() {
            return BuildResult::success(diagnostics, elapsed);
        }

        if !diagnostics.iter().any(|d| d.severity == Severity::Error) {
            let tail = stderr
                .lines()
                .rev()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("bundler exited with {}", output.status));
            diagnostics.push(Diagnostic::error(tail));
        }

        BuildResult::failure(diagnostics, elapsed)
    }
}

impl Default for CommandBundler {
    fn default() -> Self {
        Self::new(crate::config::default_bundler_program())
    }
}

#[async_trait]
impl Bundler for CommandBundler {
    type Context = CommandContext;

    async fn build(&self, options: &BundleOptions) -> BuildResult {
        self.invoke(&Self::args(options), &options.cwd).await
    }

    async fn prepare(&self, options: &BundleOptions) -> Result<Self::Context> {
        Ok(CommandContext {
            args: Self::args(options),
            cwd: options.cwd.clone(),
        })
    }

    async fn rebuild(&self, context: &Self::Context) -> BuildResult {
        self.invoke(&context.args, &context.cwd).await
    }
}

/// Render one `override` entry the way esbuild spells it:
/// `true` -> `--key`, scalars -> `--key=value`, arrays -> `--key:item`,
/// objects -> `--key:name=value`. `false` and `null` drop the flag.
fn override_args(key: &str, value: &Value) -> Vec<String> {
    match value {
        Value::Bool(true) => vec![format!("--{}", key)],
        Value::Bool(false) | Value::Null => vec![],
        Value::String(s) => vec![format!("--{}={}", key, s)],
        Value::Number(n) => vec![format!("--{}={}", key, n)],
        Value::Array(items) => items
            .iter()
            .map(|item| format!("--{}:{}", key, scalar(item)))
            .collect(),
        Value::Object(entries) => entries
            .iter()
            .map(|(name, v)| format!("--{}:{}={}", key, name, scalar(v)))
            .collect(),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pull `[ERROR]` / `[WARNING]` blocks (and bare `error:` lines) out of the
/// bundler's stderr. The first `file:line:col:` line after a headline is
/// folded into its message.
pub(crate) fn parse_diagnostics(stderr: &str) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut awaiting_location = false;

    for line in stderr.lines() {
        let trimmed = line.trim();

        let headline = if let Some(idx) = trimmed.find("[ERROR]") {
            Some((Severity::Error, &trimmed[idx + "[ERROR]".len()..]))
        } else if let Some(idx) = trimmed.find("[WARNING]") {
            Some((Severity::Warning, &trimmed[idx + "[WARNING]".len()..]))
        } else if let Some(rest) = trimmed.strip_prefix("error:") {
            Some((Severity::Error, rest))
        } else {
            None
        };

        if let Some((severity, message)) = headline {
            diagnostics.push(Diagnostic::new(severity, message.trim()));
            awaiting_location = true;
            continue;
        }

        if awaiting_location && is_location(trimmed) {
            if let Some(last) = diagnostics.last_mut() {
                last.message = format!("{} ({})", last.message, trimmed.trim_end_matches(':'));
            }
            awaiting_location = false;
        }
    }

    diagnostics
}

fn is_location(line: &str) -> bool {
    let Some(body) = line.strip_suffix(':') else {
        return false;
    };
    let mut parts = body.rsplitn(3, ':');
    let col = parts.next().unwrap_or("");
    let row = parts.next().unwrap_or("");
    let file = parts.next().unwrap_or("");
    !file.is_empty()
        && !row.is_empty()
        && row.chars().all(|c| c.is_ascii_digit())
        && !col.is_empty()
        && col.chars().all(|c| c.is_ascii_digit())
}
