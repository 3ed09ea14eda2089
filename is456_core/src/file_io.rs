//! # File I/O Module
//!
//! Project and settings files, with the safety features a shared drive
//! needs:
//! - **Atomic saves**: write a `.tmp` sibling, fsync, rename over the target
//! - **File locking**: OS lock (fs2) plus a `.lock` sibling naming the holder
//! - **Version validation**: reject files written by a newer schema
//!
//! ## File Format
//!
//! Projects are JSON (conventionally `*.is456.json`). The lock file sits
//! next to the project with `.lock` appended to the file name. Settings
//! files are TOML, see [`crate::settings::DesignSettings`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use is456_core::file_io::{load_project, save_project, FileLock};
//! use is456_core::project::Project;
//! use std::path::Path;
//!
//! let project = Project::new("Engineer", "25-001", "Client");
//! let path = Path::new("tower-a.is456.json");
//!
//! let lock = FileLock::acquire(path, "engineer@company.com").unwrap();
//! save_project(&project, path).unwrap();
//! drop(lock);
//!
//! let loaded = load_project(path).unwrap();
//! assert_eq!(loaded.meta.job_id, "25-001");
//! ```

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::project::{Project, SCHEMA_VERSION};
use crate::settings::DesignSettings;

/// Locks older than this are treated as abandoned
const STALE_LOCK_HOURS: i64 = 24;

/// Contents of a `.lock` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }

    /// The holder is gone: same machine and its process has exited, or the
    /// lock has outlived [`STALE_LOCK_HOURS`]
    fn is_stale(&self) -> bool {
        let same_machine = hostname().is_some_and(|m| m == self.machine);
        if same_machine && !process_alive(self.pid) {
            return true;
        }
        (Utc::now() - self.locked_at).num_hours() > STALE_LOCK_HOURS
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

/// Liveness from procfs; elsewhere a lock is only reclaimed by age
#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// `path` with `suffix` appended to the file name ("a.json" → "a.json.lock")
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn lock_path_for(project_path: &Path) -> PathBuf {
    sibling_with_suffix(project_path, ".lock")
}

fn read_text(path: &Path, operation: &str) -> CalcResult<String> {
    fs::read_to_string(path)
        .map_err(|e| CalcError::file_error(operation, path.display().to_string(), e.to_string()))
}

fn read_lock_info(lock_path: &Path) -> CalcResult<LockInfo> {
    let contents = read_text(lock_path, "read lock")?;
    serde_json::from_str(&contents).map_err(|e| CalcError::SerializationError {
        reason: e.to_string(),
    })
}

/// Exclusive lock on a project file, released on drop.
///
/// Holds an fs2 OS lock on the `.lock` file and writes [`LockInfo`] into it
/// so other users can see who has the project open.
#[derive(Debug)]
pub struct FileLock {
    project_path: PathBuf,
    lock_path: PathBuf,
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire the lock, taking over a stale one.
    ///
    /// Fails with [`CalcError::FileLocked`] while another live process
    /// holds it.
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> CalcResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if let Some(existing) = Self::check(path) {
            return Err(CalcError::file_locked(
                path.display().to_string(),
                format!("{} ({})", existing.user_id, existing.machine),
                existing.locked_at.to_rfc3339(),
            ));
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| {
                CalcError::file_error("create lock", lock_path.display().to_string(), e.to_string())
            })?;

        lock_file.try_lock_exclusive().map_err(|_| {
            CalcError::file_locked(
                path.display().to_string(),
                "another process".to_string(),
                "unknown".to_string(),
            )
        })?;

        let lock_json = serde_json::to_string_pretty(&info).map_err(|e| {
            CalcError::SerializationError {
                reason: e.to_string(),
            }
        })?;
        lock_file
            .write_all(lock_json.as_bytes())
            .and_then(|_| lock_file.sync_all())
            .map_err(|e| {
                CalcError::file_error("write lock", lock_path.display().to_string(), e.to_string())
            })?;

        tracing::debug!(path = %path.display(), user = %info.user_id, "project locked");
        Ok(FileLock {
            project_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Current live lock holder, if any
    pub fn check(path: &Path) -> Option<LockInfo> {
        let lock_path = lock_path_for(path);
        if !lock_path.exists() {
            return None;
        }
        read_lock_info(&lock_path).ok().filter(|info| !info.is_stale())
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// Save a project atomically.
///
/// The JSON goes to a `.tmp` sibling which is synced and then renamed over
/// `path`, so an interrupted save never leaves a truncated project.
pub fn save_project(project: &Project, path: &Path) -> CalcResult<()> {
    let json = serde_json::to_string_pretty(project).map_err(|e| CalcError::SerializationError {
        reason: e.to_string(),
    })?;

    let tmp_path = sibling_with_suffix(path, ".tmp");
    let write_tmp = || -> std::io::Result<()> {
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(json.as_bytes())?;
        tmp_file.sync_all()
    };
    write_tmp().map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CalcError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CalcError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    tracing::info!(path = %path.display(), beams = project.beam_count(), "project saved");
    Ok(())
}

/// Load a project and check its schema version.
///
/// # Errors
///
/// * [`CalcError::FileError`] - the file cannot be read
/// * [`CalcError::SerializationError`] - invalid JSON or wrong shape
/// * [`CalcError::VersionMismatch`] - written by an incompatible schema
pub fn load_project(path: &Path) -> CalcResult<Project> {
    let contents = read_text(path, "read")?;
    let project: Project =
        serde_json::from_str(&contents).map_err(|e| CalcError::SerializationError {
            reason: format!("Invalid project JSON in {}: {}", path.display(), e),
        })?;
    validate_version(&project.meta.version)?;
    project.settings.validate()?;
    tracing::info!(path = %path.display(), beams = project.beam_count(), "project loaded");
    Ok(project)
}

/// Load a project along with any live lock on it (open read-only if `Some`).
pub fn load_project_with_lock_check(path: &Path) -> CalcResult<(Project, Option<LockInfo>)> {
    let project = load_project(path)?;
    Ok((project, FileLock::check(path)))
}

/// Load design settings from a TOML file
pub fn load_settings(path: &Path) -> CalcResult<DesignSettings> {
    let contents = read_text(path, "read settings")?;
    let settings = DesignSettings::from_toml_str(&contents)?;
    settings.validate()?;
    Ok(settings)
}

fn parse_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.split('.').map(|p| p.parse::<u32>().ok());
    let major = parts.next()??;
    let minor = parts.next().flatten().unwrap_or(0);
    Some((major, minor))
}

/// Same major version, and a minor version no newer than ours
fn validate_version(file_version: &str) -> CalcResult<()> {
    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };
    let (file_major, file_minor) = parse_version(file_version).ok_or_else(mismatch)?;
    let (major, minor) = parse_version(SCHEMA_VERSION).ok_or_else(mismatch)?;
    if file_major != major || file_minor > minor {
        return Err(mismatch());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::BeamDesignInput;
    use crate::calculations::inputs::{BeamGeometry, LoadCase};
    use crate::materials::{ConcreteGrade, MaterialProperties, SteelGrade};
    use std::env::temp_dir;

    fn temp_project_path(name: &str) -> PathBuf {
        temp_dir().join(format!("is456_test_{}_{}.is456.json", name, std::process::id()))
    }

    #[test]
    fn test_lock_path_generation() {
        let lock_path = lock_path_for(Path::new("/path/to/project.is456.json"));
        assert_eq!(lock_path, Path::new("/path/to/project.is456.json.lock"));
    }

    #[test]
    fn test_lock_info_creation() {
        let info = LockInfo::new("test@example.com");
        assert_eq!(info.user_id, "test@example.com");
        assert!(info.pid > 0);
        assert!(!info.is_stale());
    }

    #[test]
    fn test_old_lock_is_stale() {
        let mut info = LockInfo::new("test@example.com");
        info.machine = "some-other-host".to_string();
        info.locked_at = Utc::now() - chrono::Duration::hours(48);
        assert!(info.is_stale());
    }

    #[test]
    fn test_fresh_foreign_lock_is_held() {
        let mut info = LockInfo::new("test@example.com");
        info.machine = "some-other-host".to_string();
        info.pid = u32::MAX;
        info.locked_at = Utc::now() - chrono::Duration::hours(2);
        assert!(!info.is_stale());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_exited_process_lock_is_stale() {
        let mut info = LockInfo::new("test@example.com");
        info.machine = hostname().unwrap_or_default();
        info.pid = u32::MAX;
        assert_eq!(info.is_stale(), hostname().is_some());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_project_path("roundtrip");
        let mut project = Project::new("Test Engineer", "TEST-001", "Test Client");
        project.add_beam(BeamDesignInput {
            label: "B1".to_string(),
            geometry: BeamGeometry::new(4000.0, 230.0, 450.0, 400.0, 25.0),
            materials: MaterialProperties::new(ConcreteGrade::M20, SteelGrade::Fe415),
            load_cases: vec![LoadCase::new("ULS", 80.0, 90.0)],
        });
        save_project(&project, &path).unwrap();

        let loaded = load_project(&path).unwrap();
        assert_eq!(loaded, project);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_save_creates_no_tmp_file() {
        let path = temp_project_path("atomic");
        let tmp_path = sibling_with_suffix(&path, ".tmp");

        save_project(&Project::new("Test", "TEST", "Client"), &path).unwrap();
        assert!(!tmp_path.exists());
        assert!(path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_file_lock_acquire_and_release() {
        let path = temp_project_path("lock_test");
        File::create(&path).unwrap();

        let lock = FileLock::acquire(&path, "test@example.com").unwrap();
        assert_eq!(lock.info.user_id, "test@example.com");
        let lock_path = lock_path_for(&path);
        assert!(lock_path.exists());

        drop(lock);
        assert!(!lock_path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("1.0.7").is_ok());
        assert!(validate_version("0.9.0").is_err());
        assert!(validate_version("2.0.0").is_err());
        assert!(validate_version("1.1.0").is_err());
        assert!(validate_version("garbage").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_project(Path::new("/definitely/not/here.is456.json")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_ERROR");
    }

    #[test]
    fn test_load_with_lock_check() {
        let path = temp_project_path("lock_check");
        save_project(&Project::new("Test", "TEST", "Client"), &path).unwrap();

        let (loaded, lock_info) = load_project_with_lock_check(&path).unwrap();
        assert_eq!(loaded.meta.job_id, "TEST");
        assert!(lock_info.is_none());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_settings_toml() {
        let path = temp_dir().join(format!("is456_settings_{}.toml", std::process::id()));
        fs::write(&path, "ductile_detailing = true\n[cost]\nsteel_per_kg = 80.0\n").unwrap();
        let settings = load_settings(&path).unwrap();
        assert!(settings.ductile_detailing);
        assert_eq!(settings.cost.steel_per_kg, 80.0);
        let _ = fs::remove_file(&path);
    }
}
