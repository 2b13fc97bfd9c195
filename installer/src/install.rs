//! Hand-off of verified packages to the system package installer.
//!
//! Only files whose digest matched are ever passed on. Installation itself
//! belongs to `dpkg`; this module orders the packages, checks that no other
//! installer holds the dpkg lock, and reports which packages failed.

use crate::catalog::classify::{Flavor, PackageRole, classify};
use crate::process::{CommandExecutor, failure_detail};
use camino::{Utf8Path, Utf8PathBuf};
use nix::fcntl::{FcntlArg, fcntl};
use nix::libc;
use std::fs::OpenOptions;
use std::io;
use std::os::fd::AsRawFd;

/// Lock file dpkg holds while it runs.
pub const DPKG_LOCK_PATH: &str = "/var/lib/dpkg/lock";

/// Errors raised while installing packages.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// Another installer holds the dpkg lock.
    #[error("another installer holds {path}; wait for it to finish and retry")]
    Locked {
        /// The lock file.
        path: Utf8PathBuf,
    },

    /// The lock file exists but cannot be opened, usually for lack of root.
    #[error("cannot open {path}: {source}; installing packages requires root")]
    LockInaccessible {
        /// The lock file.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The installer program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// The installer program.
        program: String,
        /// The underlying spawn error.
        #[source]
        source: io::Error,
    },

    /// One or more packages failed to install.
    #[error("{} package(s) failed to install; last error: {last_detail}", failed.len())]
    PackagesFailed {
        /// File names of the packages that failed.
        failed: Vec<String>,
        /// Output of the last failure.
        last_detail: String,
    },
}

/// Receives verified local package paths for installation.
#[cfg_attr(test, mockall::automock)]
pub trait InstallGateway {
    /// Install `packages`, which must all have passed verification.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError`] when installation cannot start or a package
    /// fails.
    fn install(&self, packages: &[Utf8PathBuf]) -> Result<(), InstallError>;
}

/// Installs packages one at a time with `dpkg -i`.
#[derive(Debug)]
pub struct DpkgGateway<E> {
    executor: E,
    lock_path: Utf8PathBuf,
}

impl<E: CommandExecutor> DpkgGateway<E> {
    /// Create a gateway guarding on the system dpkg lock.
    pub fn new(executor: E) -> Self {
        Self::with_lock_path(executor, Utf8PathBuf::from(DPKG_LOCK_PATH))
    }

    /// Create a gateway guarding on `lock_path`.
    pub const fn with_lock_path(executor: E, lock_path: Utf8PathBuf) -> Self {
        Self {
            executor,
            lock_path,
        }
    }

    /// Refuse to proceed while another process holds a write lock on the
    /// dpkg lock file.
    ///
    /// dpkg takes a POSIX record lock (`fcntl`), which `flock` cannot see,
    /// so the kernel is asked with `F_GETLK` whether a whole-file write lock
    /// could be placed. Nothing is locked by the check itself.
    fn ensure_unlocked(&self) -> Result<(), InstallError> {
        if !self.lock_path.exists() {
            return Ok(());
        }
        let inaccessible = |source: io::Error| InstallError::LockInaccessible {
            path: self.lock_path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(inaccessible)?;

        let mut query = libc::flock {
            l_type: libc::F_WRLCK as libc::c_short,
            l_whence: libc::SEEK_SET as libc::c_short,
            l_start: 0,
            l_len: 0,
            l_pid: 0,
        };
        fcntl(file.as_raw_fd(), FcntlArg::F_GETLK(&mut query))
            .map_err(|errno| inaccessible(io::Error::from(errno)))?;

        if query.l_type == libc::F_UNLCK as libc::c_short {
            Ok(())
        } else {
            log::debug!("{} is locked by pid {}", self.lock_path, query.l_pid);
            Err(InstallError::Locked {
                path: self.lock_path.clone(),
            })
        }
    }
}

impl<E: CommandExecutor> InstallGateway for DpkgGateway<E> {
    fn install(&self, packages: &[Utf8PathBuf]) -> Result<(), InstallError> {
        let mut failed = Vec::new();
        let mut last_detail = String::new();

        for package in install_order(packages) {
            self.ensure_unlocked()?;
            let name = package.file_name().unwrap_or(package.as_str()).to_owned();
            log::debug!("installing {name}");
            let output = self
                .executor
                .run("dpkg", &["-i", package.as_str()])
                .map_err(|source| InstallError::Spawn {
                    program: "dpkg".to_owned(),
                    source,
                })?;
            if !output.status.success() {
                last_detail = failure_detail(&output);
                log::warn!("dpkg failed for {name}: {last_detail}");
                failed.push(name);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(InstallError::PackagesFailed {
                failed,
                last_detail,
            })
        }
    }
}

/// Order packages so that dependencies install first.
///
/// Shared headers precede flavored headers, which precede modules, which
/// precede images. Unrecognised files go last; ties keep their input order.
#[must_use]
pub fn install_order(packages: &[Utf8PathBuf]) -> Vec<&Utf8Path> {
    let mut ordered: Vec<&Utf8Path> = packages.iter().map(Utf8PathBuf::as_path).collect();
    ordered.sort_by_key(|path| install_rank(path));
    ordered
}

fn install_rank(path: &Utf8Path) -> u8 {
    let Some(class) = path.file_name().and_then(classify) else {
        return u8::MAX;
    };
    match (class.role, class.flavor) {
        (PackageRole::Headers, Flavor::Common) => 0,
        (PackageRole::Headers, _) => 1,
        (PackageRole::Modules, _) => 2,
        (PackageRole::Image | PackageRole::ImageUnsigned, _) => 3,
    }
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
