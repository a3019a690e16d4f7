//! Layering order: defaults, then file, then environment, then flags.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::{fixture, rstest};
use tempfile::TempDir;
use trellis_config::{Config, LogFormat, SocketEndpoint, default_socket_endpoint};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Serialises environment access and restores the previous values on drop.
struct EnvGuard {
    previous: Vec<(&'static str, Option<OsString>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    fn new() -> Self {
        let lock = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut guard = Self {
            previous: Vec::new(),
            _lock: lock,
        };
        for key in [
            "TRELLIS_CONFIG_PATH",
            "TRELLIS_LISTEN_SOCKET",
            "TRELLIS_LOG_FORMAT",
            "TRELLIS_PAGE_SIZE",
        ] {
            guard.remember(key);
            unsafe { std::env::remove_var(key) };
        }
        guard
    }

    fn remember(&mut self, key: &'static str) {
        if self.previous.iter().all(|(known, _)| *known != key) {
            self.previous.push((key, std::env::var_os(key)));
        }
    }

    fn set(&mut self, key: &'static str, value: impl AsRef<OsStr>) {
        self.remember(key);
        // Environment mutation is `unsafe` on newer toolchains; the mutex keeps
        // these tests from racing each other.
        unsafe { std::env::set_var(key, value) };
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        while let Some((key, value)) = self.previous.pop() {
            match value {
                Some(value) => unsafe { std::env::set_var(key, value) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

#[fixture]
fn env() -> EnvGuard {
    EnvGuard::new()
}

#[fixture]
fn workdir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

fn write_config(dir: &Path, body: &str) -> OsString {
    let path = dir.join("trellis.toml");
    fs::write(&path, body).expect("write config");
    path.into_os_string()
}

fn args(extra: &[&str]) -> Vec<OsString> {
    std::iter::once("trellisd")
        .chain(extra.iter().copied())
        .map(OsString::from)
        .collect()
}

#[rstest]
fn defaults_apply_without_overrides(#[from(env)] _env: EnvGuard) {
    let config = Config::load_from_iter(args(&[])).expect("load defaults");
    assert_eq!(config.listen_socket(), &default_socket_endpoint());
    assert_eq!(config.page_size(), 50);
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[rstest]
fn file_overrides_defaults(#[from(env)] _env: EnvGuard, workdir: TempDir) {
    let path = write_config(
        workdir.path(),
        "page_size = 7\nlisten_socket = { transport = \"tcp\", host = \"127.0.0.1\", port = 9100 }\n",
    );
    let mut argv = args(&["--config-path"]);
    argv.push(path);

    let config = Config::load_from_iter(argv).expect("load file");
    assert_eq!(config.page_size(), 7);
    assert_eq!(config.listen_socket(), &SocketEndpoint::tcp("127.0.0.1", 9100));
}

#[rstest]
fn environment_overrides_file(mut env: EnvGuard, workdir: TempDir) {
    let path = write_config(workdir.path(), "page_size = 7\nlog_format = \"json\"\n");
    env.set("TRELLIS_PAGE_SIZE", "9");
    env.set("TRELLIS_LOG_FORMAT", "compact");
    let mut argv = args(&["--config-path"]);
    argv.push(path);

    let config = Config::load_from_iter(argv).expect("load env");
    assert_eq!(config.page_size(), 9);
    assert_eq!(config.log_format(), LogFormat::Compact);
}

#[rstest]
fn flags_override_environment(mut env: EnvGuard) {
    env.set("TRELLIS_PAGE_SIZE", "9");

    let config = Config::load_from_iter(args(&[
        "--page-size",
        "3",
        "--listen-socket",
        "tcp://localhost:9200",
    ]))
    .expect("load flags");
    assert_eq!(config.page_size(), 3);
    assert_eq!(config.listen_socket(), &SocketEndpoint::tcp("localhost", 9200));
}

#[rstest]
fn malformed_files_are_reported(#[from(env)] _env: EnvGuard, workdir: TempDir) {
    let path = write_config(workdir.path(), "page_size = \"many\"\n");
    let mut argv = args(&["--config-path"]);
    argv.push(path);

    assert!(Config::load_from_iter(argv).is_err());
}
