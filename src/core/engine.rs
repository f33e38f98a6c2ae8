// src/core/engine.rs

use crate::{
    constants::{ENGINE_MARKER, PROBE_FLAG},
    core::{
        catalog::{Generation, VersionCatalog},
        sniff,
    },
    dev_utils,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Mutex, OnceLock, PoisonError};
use thiserror::Error;

lazy_static! {
    /// Case-insensitive engine marker, matched against raw bytes.
    static ref MARKER_RE: regex::bytes::Regex =
        regex::bytes::Regex::new(&format!("(?i){}", regex::escape(ENGINE_MARKER)))
            .expect("engine marker pattern is valid");
    /// `v3.2.3.stable.mono.official` and the like; group 1 is the version without `v`.
    static ref VERSION_RE: Regex =
        Regex::new(r"(?i)v((?:\d+\.){1,5}(?:\w+\.?){1,4})").expect("version pattern is valid");
    static ref MONO_RE: Regex = Regex::new(r"(?i)\.mono\.").expect("mono pattern is valid");
}

/// Errors raised while validating or probing an engine executable.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Nothing exists at the given path.
    #[error("Engine executable '{0}' does not exist.")]
    NotFound(PathBuf),
    /// The file exists but is not an engine executable.
    #[error("File '{path}' is not a valid engine executable: {reason}")]
    InvalidFormat {
        /// Offending file.
        path: PathBuf,
        /// Which check failed.
        reason: String,
    },
    /// Reading the file failed.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// The executable could not be started.
    #[error("Engine '{path}' could not be executed: {source}")]
    ProbeFailed {
        /// Executable that was run.
        path: PathBuf,
        /// Spawn error.
        #[source]
        source: std::io::Error,
    },
    /// The executable ran but printed no version.
    #[error("Engine '{0}' did not report a version.")]
    VersionNotFound(PathBuf),
}

/// Build variant of an engine.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineKind {
    /// Regular build.
    #[default]
    Standard,
    /// C# enabled build.
    Mono,
}

impl EngineKind {
    /// Lower-case name, as used in remote catalog queries.
    pub fn as_query_value(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Mono => "mono",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("Standard"),
            Self::Mono => f.write_str("Mono"),
        }
    }
}

/// Result of probing an engine executable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EngineInfo {
    /// Version without the leading `v`, e.g. `3.2.3.stable.mono.official`.
    pub version: String,
    /// Standard or Mono build.
    pub kind: EngineKind,
}

impl EngineInfo {
    /// Extracts version and kind from the engine's own help output.
    pub fn from_output(output: &str) -> Option<Self> {
        let version = VERSION_RE.captures(output)?.get(1)?.as_str().to_string();
        let kind = if MONO_RE.is_match(output) {
            EngineKind::Mono
        } else {
            EngineKind::Standard
        };
        Some(Self { version, kind })
    }

    /// Leading numeric component of the version.
    pub fn major(&self) -> Option<u8> {
        self.version.split('.').next()?.parse().ok()
    }

    /// Catalog entry matching the major version.
    pub fn generation(&self, catalog: &VersionCatalog) -> Option<Generation> {
        catalog.by_ordinal(self.major()?)
    }
}

/// A validated engine executable.
///
/// Construction runs the content-type check and the marker scan; a descriptor
/// only exists if both passed. Version and kind are probed lazily, once.
#[derive(Debug)]
pub struct EngineDescriptor {
    path: PathBuf,
    validated: bool,
    is_default: bool,
    info: OnceLock<EngineInfo>,
    probe_lock: Mutex<()>,
}

impl EngineDescriptor {
    /// Opens and validates the executable at `path`.
    pub fn open(path: &Path) -> Result<Self, EngineError> {
        Self::open_with_default(path, false)
    }

    /// Opens and validates the executable at `path`, flagging it as the default engine.
    pub fn open_with_default(path: &Path, is_default: bool) -> Result<Self, EngineError> {
        if !path.exists() {
            return Err(EngineError::NotFound(path.to_path_buf()));
        }
        let path = dunce::canonicalize(path)?;

        check_content_type(&path)?;
        check_marker(&path)?;

        log::debug!("Validated engine executable at {}", path.display());
        Ok(Self {
            path,
            validated: true,
            is_default,
            info: OnceLock::new(),
            probe_lock: Mutex::new(()),
        })
    }

    /// Builds a descriptor without the content checks, for tests that run scripts.
    #[cfg(test)]
    pub(crate) fn unchecked(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            validated: false,
            is_default: false,
            info: OnceLock::new(),
            probe_lock: Mutex::new(()),
        }
    }

    /// Absolute path of the executable.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the content checks passed when the descriptor was opened.
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Whether this is the library's default engine.
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Probe result, if a probe already succeeded.
    pub fn cached_info(&self) -> Option<&EngineInfo> {
        self.info.get()
    }

    /// Runs the executable with the help flag and extracts version and kind.
    ///
    /// Only the first successful call launches a process; later calls return the
    /// cached result. Concurrent callers wait for the in-flight probe.
    pub fn probe(&self) -> Result<&EngineInfo, EngineError> {
        if let Some(info) = self.info.get() {
            return Ok(info);
        }
        let _guard = self
            .probe_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(info) = self.info.get() {
            return Ok(info);
        }

        let info = probe_executable(&self.path, &[PROBE_FLAG])?;
        Ok(self.info.get_or_init(|| info))
    }

    /// Human readable name, e.g. `Godot Engine (Mono) 3.2.3.stable.mono.official`.
    /// Probes the engine if needed.
    pub fn display_name(&self) -> Result<String, EngineError> {
        let info = self.probe()?;
        Ok(format!("{} ({}) {}", ENGINE_MARKER, info.kind, info.version))
    }
}

fn check_content_type(path: &Path) -> Result<(), EngineError> {
    let content_type = sniff::content_type_of(path)?;
    if !sniff::is_executable_content_type(content_type) {
        return Err(EngineError::InvalidFormat {
            path: path.to_path_buf(),
            reason: format!("content type '{}' is not an executable type", content_type),
        });
    }
    Ok(())
}

fn check_marker(path: &Path) -> Result<(), EngineError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if MARKER_RE.is_match(&line) {
            return Ok(());
        }
    }
    Err(EngineError::InvalidFormat {
        path: path.to_path_buf(),
        reason: format!("'{}' marker not found", ENGINE_MARKER),
    })
}

/// Runs `path` with `args`, waits for it to exit and parses its standard output.
pub(crate) fn probe_executable(path: &Path, args: &[&str]) -> Result<EngineInfo, EngineError> {
    let _timer = dev_utils::BlockTimer::new(format!("probe {}", path.display()));
    log::debug!("Probing engine version: {} {:?}", path.display(), args);

    let output = Command::new(path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| EngineError::ProbeFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    let text = String::from_utf8_lossy(&output.stdout);
    EngineInfo::from_output(&text).ok_or_else(|| EngineError::VersionNotFound(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ELF_HEADER: &[u8] = &[0x7F, b'E', b'L', b'F', 2, 1, 1, 0, 0, 0, 0, 0];

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_mono_version() {
        let info =
            EngineInfo::from_output("Godot Engine v3.2.3.stable.mono.official - https://godotengine.org\n")
                .unwrap();
        assert_eq!(info.version, "3.2.3.stable.mono.official");
        assert_eq!(info.kind, EngineKind::Mono);
        assert_eq!(info.major(), Some(3));
    }

    #[test]
    fn test_parse_standard_version_upper_case_prefix() {
        let info = EngineInfo::from_output("Godot Engine V4.1.stable.official.970459615\n").unwrap();
        assert_eq!(info.version, "4.1.stable.official.970459615");
        assert_eq!(info.kind, EngineKind::Standard);
        assert_eq!(
            info.generation(&VersionCatalog::godot()).unwrap().ordinal,
            4
        );
    }

    #[test]
    fn test_parse_without_version() {
        assert!(EngineInfo::from_output("Usage: godot [options] [path to scene]").is_none());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = EngineDescriptor::open(Path::new("/definitely/not/here/godot"));
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_text_file_fails_content_type_check() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "godot.sh", b"#!/bin/sh\necho Godot Engine v3.2.3.stable\n");
        let result = EngineDescriptor::open(&path);
        assert!(matches!(result, Err(EngineError::InvalidFormat { .. })));
    }

    #[test]
    fn test_binary_without_marker_fails() {
        let dir = TempDir::new().unwrap();
        let mut content = ELF_HEADER.to_vec();
        content.extend_from_slice(b"\nsome other program\n");
        let path = write_file(&dir, "blender", &content);
        let result = EngineDescriptor::open(&path);
        assert!(matches!(result, Err(EngineError::InvalidFormat { .. })));
    }

    #[test]
    fn test_binary_with_marker_is_validated() {
        let dir = TempDir::new().unwrap();
        let mut content = ELF_HEADER.to_vec();
        content.extend_from_slice(b"\x00\x01\ncompiled by GODOT ENGINE contributors\n\x00");
        let path = write_file(&dir, "godot", &content);

        let engine = EngineDescriptor::open_with_default(&path, true).unwrap();
        assert!(engine.is_validated());
        assert!(engine.is_default());
        assert!(engine.cached_info().is_none());
        assert!(engine.path().is_absolute());
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_executable_reads_stdout() {
        let info = probe_executable(
            Path::new("/bin/sh"),
            &["-c", "echo 'Godot Engine v3.2.3.stable.mono.official'"],
        )
        .unwrap();
        assert_eq!(info.version, "3.2.3.stable.mono.official");
        assert_eq!(info.kind, EngineKind::Mono);
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_executable_without_version() {
        let result = probe_executable(Path::new("/bin/sh"), &["-c", "echo usage"]);
        assert!(matches!(result, Err(EngineError::VersionNotFound(_))));
    }

    #[cfg(unix)]
    fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = write_file(dir, name, format!("#!/bin/sh\n{}\n", body).as_bytes());
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_version_is_read_once_and_cached() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "godot", "echo 'Godot Engine v3.2.3.stable.mono.official'");
        let engine = EngineDescriptor::unchecked(&path);

        // A freshly written script can briefly report "text file busy" while another
        // test thread forks; failures are not cached, so retrying is safe.
        let mut first = engine.probe();
        for _ in 0..20 {
            if first.is_ok() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
            first = engine.probe();
        }
        let first = first.unwrap();
        assert_eq!(first.version, "3.2.3.stable.mono.official");
        assert_eq!(first.kind, EngineKind::Mono);

        // Whatever the executable prints now, the cached answer wins.
        write_script(&dir, "godot", "echo 'Godot Engine v4.1.stable.official'");
        let second = engine.probe().unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(second.version, "3.2.3.stable.mono.official");
        assert_eq!(
            engine.display_name().unwrap(),
            "Godot Engine (Mono) 3.2.3.stable.mono.official"
        );

        // Without the executable at all, the cache still answers.
        fs::remove_file(&path).unwrap();
        assert!(std::ptr::eq(engine.probe().unwrap(), first));
        assert_eq!(engine.cached_info(), Some(first));
    }

    #[test]
    fn test_probe_of_non_executable_fails_and_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let mut content = ELF_HEADER.to_vec();
        content.extend_from_slice(b"\nGodot Engine\n");
        let path = write_file(&dir, "godot", &content);

        // Valid by content, but written without execute permission.
        let engine = EngineDescriptor::open(&path).unwrap();
        assert!(engine.probe().is_err());
        assert!(engine.cached_info().is_none());
    }
}
