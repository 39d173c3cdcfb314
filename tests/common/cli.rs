use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temp directory with an initialized `.tracker/` for running `trk`.
pub struct TrkWorkspace {
    pub temp_dir: TempDir,
}

impl TrkWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        std::fs::create_dir_all(temp_dir.path().join(".tracker")).expect("create .tracker");
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn db_path(&self) -> PathBuf {
        self.root().join(".tracker").join("tracker.db")
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root().join(name);
        std::fs::write(&path, contents).expect("write file");
        path
    }
}

/// `trk` running inside `workspace` with a clean environment.
pub fn trk(workspace: &TrkWorkspace) -> Command {
    let mut cmd = Command::cargo_bin("trk").expect("trk binary");
    cmd.current_dir(workspace.root())
        .env("HOME", workspace.root())
        .env_remove("TRACKER_DB")
        .env_remove("TRACKER_ACTOR")
        .env_remove("TRACKER_DIR")
        .env_remove("RUST_LOG");
    cmd
}
