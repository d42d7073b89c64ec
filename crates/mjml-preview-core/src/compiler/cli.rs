/*
 * compiler/cli.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * MJML compilation through the mjml command-line tool.
 */

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::diagnostics::parse_diagnostics;
use super::{CompileOptions, CompileOutput, CompilerError, MarkupCompiler};
use crate::config::PreviewConfig;

/// Find the `mjml` binary.
///
/// Searches in this order:
/// 1. `explicit`, when it names an existing file
/// 2. `MJML_PATH` environment variable
/// 3. System PATH via `which`
pub fn find_mjml(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit
        && path.is_file()
    {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var("MJML_PATH") {
        let env_path = PathBuf::from(env_path);
        if env_path.is_file() {
            return Some(env_path);
        }
    }

    which::which("mjml").ok()
}

/// Compiler that pipes the document through `mjml -i -s`.
#[derive(Debug, Clone, Default)]
pub struct MjmlCliCompiler {
    binary: Option<PathBuf>,
}

impl MjmlCliCompiler {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self { binary }
    }

    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new(config.mjml_path.clone())
    }

    fn args(options: &CompileOptions) -> Vec<String> {
        vec![
            "-i".to_string(),
            "-s".to_string(),
            format!("--config.validationLevel={}", options.level),
            format!("--config.minify={}", options.minify),
            format!("--config.beautify={}", options.beautify),
            format!("--config.filePath={}", options.file_path.display()),
        ]
    }
}

#[async_trait]
impl MarkupCompiler for MjmlCliCompiler {
    async fn compile(
        &self,
        text: &str,
        options: &CompileOptions,
    ) -> Result<CompileOutput, CompilerError> {
        let binary = find_mjml(self.binary.as_deref()).ok_or(CompilerError::NotFound)?;
        debug!(binary = %binary.display(), cwd = %options.cwd.display(), "Running mjml");

        let mut child = Command::new(&binary)
            .args(Self::args(options))
            .current_dir(&options.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CompilerError::Spawn {
                binary: binary.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        let errors = parse_diagnostics(&stderr);

        if !output.status.success() && errors.is_empty() {
            return Err(CompilerError::Failed {
                status: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!(
            html_bytes = stdout.len(),
            errors = errors.len(),
            "mjml finished"
        );
        Ok(CompileOutput {
            html: (!stdout.trim().is_empty()).then_some(stdout),
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationLevel;

    fn options(dir: &Path) -> CompileOptions {
        CompileOptions {
            level: ValidationLevel::Skip,
            file_path: dir.join("a.mjml"),
            minify: false,
            beautify: true,
            cwd: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_args() {
        let args = MjmlCliCompiler::args(&options(Path::new("/mail")));
        assert_eq!(args[0], "-i");
        assert!(args.contains(&"--config.validationLevel=skip".to_string()));
        assert!(args.contains(&"--config.beautify=true".to_string()));
        assert!(args.contains(&"--config.filePath=/mail/a.mjml".to_string()));
    }

    #[test]
    fn test_explicit_binary_wins() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("mjml");
        std::fs::write(&binary, "").unwrap();
        assert_eq!(find_mjml(Some(&binary)), Some(binary));
    }

    #[cfg(unix)]
    fn fake_mjml(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-mjml");
        std::fs::write(&path, format!("#!/bin/sh\ncat > /dev/null\n{}\n", script)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compiles_through_subprocess() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = MjmlCliCompiler::new(Some(fake_mjml(dir.path(), "echo '<html>ok</html>'")));

        let output = compiler
            .compile("<mjml></mjml>", &options(dir.path()))
            .await
            .unwrap();
        assert_eq!(output.html.as_deref().map(str::trim), Some("<html>ok</html>"));
        assert!(output.errors.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_structured_errors_from_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = "echo 'Line 3 of a.mjml (mj-text) - bad attribute' >&2\nexit 1";
        let compiler = MjmlCliCompiler::new(Some(fake_mjml(dir.path(), script)));

        let output = compiler
            .compile("<mjml></mjml>", &options(dir.path()))
            .await
            .unwrap();
        assert_eq!(output.html, None);
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].line, Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unstructured_failure() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = MjmlCliCompiler::new(Some(fake_mjml(dir.path(), "echo 'kaboom' >&2\nexit 2")));

        let err = compiler
            .compile("<mjml></mjml>", &options(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, CompilerError::Failed { status: Some(2), .. }));
    }
}
