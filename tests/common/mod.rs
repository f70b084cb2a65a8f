//! Common test utilities and helpers

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ENV_OVERRIDES: [&str; 6] = [
    "COUNTERPARTY_MAX_INPUT",
    "COUNTERPARTY_MAX_LOG_LEVEL",
    "COUNTERPARTY_MAX_SHUFFLE_PARTITIONS",
    "COUNTERPARTY_MAX_WORKER_THREADS",
    "COUNTERPARTY_MAX_ON_INVALID_RECORD",
    "COUNTERPARTY_MAX_FORMAT",
];

/// Scratch working directory for running the binary
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file relative to the workspace, creating parent directories
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// The binary, run inside the workspace with a clean environment
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("counterparty-max").unwrap();
        cmd.current_dir(self.path());
        for key in ENV_OVERRIDES {
            cmd.env_remove(key);
        }
        cmd.env_remove("RUST_LOG");
        cmd
    }
}

/// Transactions where u1 ties between c1 and c2
pub const TIE_CSV: &str = "\
user_id,counterparty_id,amount
u1,c1,50
u1,c1,30
u1,c2,80
u2,c3,5
";
