#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tempfile::TempDir;

use oud::*;

pub const GREET: &str = r#"
(name greet)
(node q start)
(text "hi" n1)
"#;

pub const SHOP: &str = r#"
;; a small shop
(name shop)
(node s start)
(text "Welcome!" ask)
(node q ask)
(text "Buy something?" quit)
(resp "No thanks" quit)
(trig "Show me" bye open_shop)
(node s bye)
(text "Take care." quit)
"#;

pub const BROKEN: &str = r#"
(name broken)
(node s start)
(text "hello" quit)
(jump somewhere)
"#;

/// Scratch input, output and cache directories for one build.
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let _ = pretty_env_logger::try_init();

        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("scripts")).unwrap();
        Self { root }
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root.path().join("scripts")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.path().join("out")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.path().join("cache")
    }

    pub fn config(&self) -> BuildConfig {
        let mut config = BuildConfig::new(self.input_dir(), self.output_dir(), self.cache_dir());
        config.jobs = 2;
        config
    }

    pub fn write_script(&self, name: &str, src: &str) -> PathBuf {
        let path = self.input_dir().join(name);
        fs::write(&path, src).unwrap();
        path
    }

    pub fn artifact(&self, name: &str) -> PathBuf {
        self.output_dir().join(name)
    }

    pub fn read_artifact(&self, name: &str) -> String {
        fs::read_to_string(self.artifact(name)).unwrap()
    }
}

/// Moves a file's modification time to a fixed point.
pub fn set_modified(path: &Path, secs: u64) {
    let time: SystemTime = UNIX_EPOCH + Duration::from_secs(secs);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

pub fn modified(path: &Path) -> SystemTime {
    fs::metadata(path).unwrap().modified().unwrap()
}
