//! Shared helpers for the integration suite.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use anyhow::Result;
use assert_cmd::Command;
use reportloom::document::{Document, DocumentTemplate};
use reportloom::templating::RenderContext;
use serde_json::Value;
use tempfile::TempDir;

/// Compile an in-memory document.
pub fn compile(bytes: &[u8]) -> Result<DocumentTemplate> {
    Ok(DocumentTemplate::compile(Document::load(bytes)?)?)
}

/// Compile and render in one go, returning the rendered main content.
pub fn render_main_content(bytes: &[u8], data: Value) -> Result<String> {
    let template = compile(bytes)?;
    let output = template.render(&RenderContext::from_json(data)?)?;
    Ok(output.main_content()?)
}

const CONFIG_FILE: &str = "reportloom.toml";

/// A scratch directory plus a way to run the binary in it.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(CONFIG_FILE), "")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the project root, returning its path.
    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// The binary with the project as working directory and an isolated
    /// config location.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("reportloom").expect("binary is built for tests");
        cmd.current_dir(self.dir.path())
            .env("REPORTLOOM_CONFIG", self.dir.path().join(CONFIG_FILE))
            .env_remove("RUST_LOG");
        cmd
    }
}
