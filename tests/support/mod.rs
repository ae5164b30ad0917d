#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated config and database under a temp directory
pub struct Sandbox {
    dir: TempDir,
    config: PathBuf,
}

impl Sandbox {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let config = dir.path().join("config.toml");
        let database = dir.path().join("data").join("organizer.db");
        std::fs::write(
            &config,
            format!("database_path = {:?}\n", database.to_string_lossy()),
        )?;
        Ok(Self { dir, config })
    }

    /// A sandbox that has already finished onboarding
    pub fn onboarded() -> Result<Self, Box<dyn std::error::Error>> {
        let sandbox = Self::new()?;
        for step in ["next", "next", "skip", "next", "finish"] {
            sandbox.cmd()?.args(["onboarding", step]).assert().success();
        }
        Ok(sandbox)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cmd(&self) -> Result<Command, Box<dyn std::error::Error>> {
        let mut cmd = Command::cargo_bin("organizer")?;
        cmd.current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(&self.config);
        Ok(cmd)
    }
}
