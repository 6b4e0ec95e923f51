//! Failure artifacts written to disk

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use suiterun_core::{ArtifactRef, ArtifactSink, ExecutionContext};

use crate::error::RunnerResult;

/// Writes one log file per failed test attempt under `dir/<suite path>/`
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the artifact for this context is written
    pub fn artifact_path(&self, ctx: &ExecutionContext) -> PathBuf {
        let mut path = self.dir.clone();
        for segment in ctx.suite_path() {
            path.push(sanitize(segment));
        }
        let file_name = if ctx.attempt() > 1 {
            format!("{} (failed, attempt {}).log", sanitize(ctx.title()), ctx.attempt())
        } else {
            format!("{} (failed).log", sanitize(ctx.title()))
        };
        path.push(file_name);
        path
    }

    async fn write(&self, ctx: &ExecutionContext) -> RunnerResult<ArtifactRef> {
        let path = self.artifact_path(ctx);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = render(ctx);
        tokio::fs::write(&path, body.as_bytes()).await?;

        let digest = hex::encode(Sha256::digest(body.as_bytes()));
        debug!("Artifact written to: {}", path.display());
        Ok(ArtifactRef {
            path,
            digest: Some(digest),
        })
    }
}

#[async_trait]
impl ArtifactSink for ArtifactStore {
    async fn capture(&self, ctx: &ExecutionContext) -> Option<ArtifactRef> {
        match self.write(ctx).await {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                warn!("Failed to capture artifact for '{}': {}", ctx.full_title(), e);
                None
            }
        }
    }
}

fn render(ctx: &ExecutionContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "test:     {}", ctx.full_title());
    let _ = writeln!(out, "attempt:  {}", ctx.attempt());
    let _ = writeln!(out, "captured: {}", chrono::Utc::now().to_rfc3339());
    if !ctx.tags().is_empty() {
        let _ = writeln!(out, "tags:     {}", ctx.tags().join(", "));
    }
    if let Some(previous) = ctx.previous() {
        let _ = writeln!(out, "previous: {} ({:?})", previous.full_title, previous.state);
    }
    let _ = writeln!(out);
    for (i, failure) in ctx.failures().iter().enumerate() {
        let _ = writeln!(out, "failure {}: {}", i + 1, failure);
        if !failure.hook_suite.is_empty() {
            let _ = writeln!(out, "  in suite: {}", failure.hook_suite.join(" "));
        }
        if failure.timed_out {
            let _ = writeln!(out, "  timed out");
        }
    }
    out
}

/// Replace characters that are not allowed in file names.
///
/// `.` and `..` would resolve outside the suite directory, so their dots
/// are replaced too.
fn sanitize(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned,
    }
}
