//! Shared helpers for integration tests: isolated homes and fake
//! interpreters written as shell scripts.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use artrpc::Config;
use tempfile::TempDir;

/// A temporary directory holding an artrpc home and any fake interpreters.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    pub fn home_str(&self) -> String {
        self.home().to_str().expect("utf-8 temp path").to_string()
    }

    pub fn store_path(&self) -> PathBuf {
        self.home().join("stores").join("rpc.json")
    }

    /// Write an executable `#!/bin/sh` script named `name` running `body`.
    #[cfg(unix)]
    pub fn fake_interpreter(&self, name: &str, body: &str) -> PathBuf {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let path = self.dir.path().join(name);
        let mut file = fs::File::create(&path).expect("create fake interpreter");
        write!(file, "#!/bin/sh\n{body}\n").expect("write fake interpreter");
        file.sync_all().expect("sync fake interpreter");
        drop(file);

        let mut perms = fs::metadata(&path).expect("stat").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod fake interpreter");
        path
    }

    /// Config for this sandbox's home using `executable`.
    pub fn config(&self, executable: &Path) -> Config {
        self.config_with_timeout(executable, Duration::from_secs(10))
    }

    pub fn config_with_timeout(&self, executable: &Path, timeout: Duration) -> Config {
        Config::builder()
            .home(self.home_str())
            .executable(executable)
            .timeout(timeout)
            .build()
            .expect("valid config")
    }

    /// Pre-create the store document with `content`.
    pub fn write_store(&self, content: &str) {
        fs::create_dir_all(self.home().join("stores")).expect("create stores dir");
        fs::write(self.store_path(), content).expect("write store");
    }
}
