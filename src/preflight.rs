//! Pre-flight checks for the host environment
//!
//! Run once, before the pipeline enters its first stage:
//! - Root privileges (EUID 0, or a validated sudo credential)
//! - UEFI firmware (`/sys/firmware/efi` exists)
//! - Every host binary the pipeline invokes is on PATH
//!
//! Each failure is a precondition error, not a pipeline stage failure.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{InstallError, Result};
use crate::types::BootFilesystem;

/// The kernel exposes this directory only when booted in UEFI mode
pub const EFI_FIRMWARE_PATH: &str = "/sys/firmware/efi";

/// Host binaries used regardless of configuration
const BASE_BINARIES: &[&str] = &[
    "wipefs",      // util-linux
    "parted",      // parted
    "mkfs.btrfs",  // btrfs-progs
    "btrfs",       // btrfs-progs
    "mount",       // util-linux
    "umount",      // util-linux
    "blkid",       // util-linux
    "mkdir",       // coreutils
    "tee",         // coreutils
    "chmod",       // coreutils
    "pacstrap",    // arch-install-scripts
    "arch-chroot", // arch-install-scripts
];

/// Check if running as root (EUID 0)
pub fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// True when the firmware interface directory exists
pub fn is_uefi(efi_path: &Path) -> bool {
    efi_path.is_dir()
}

/// Binaries the pipeline will call for this boot filesystem.
pub fn required_binaries(boot_fs: BootFilesystem, uses_sudo: bool) -> Vec<&'static str> {
    let mut binaries = BASE_BINARIES.to_vec();
    binaries.push(match boot_fs {
        BootFilesystem::Fat32 => "mkfs.vfat",
        BootFilesystem::Ext4 => "mkfs.ext4",
    });
    if uses_sudo {
        binaries.push("sudo");
    }
    binaries
}

/// Names from `binaries` that cannot be found on PATH
pub fn missing_binaries(binaries: &[&str]) -> Vec<String> {
    binaries
        .iter()
        .filter(|name| match which::which(name) {
            Ok(path) => {
                debug!("Found {} at {}", name, path.display());
                false
            }
            Err(_) => true,
        })
        .map(|name| name.to_string())
        .collect()
}

/// Check root, then UEFI, then binaries; the first failure wins.
pub fn verify(privileged: bool, efi_path: &Path, binaries: &[&str]) -> Result<()> {
    if !privileged {
        return Err(InstallError::NotRoot);
    }

    if !is_uefi(efi_path) {
        return Err(InstallError::NotUefi {
            path: efi_path.display().to_string(),
        });
    }

    let missing = missing_binaries(binaries);
    if !missing.is_empty() {
        return Err(InstallError::MissingBinaries(missing));
    }

    info!("Pre-flight checks passed ({} binaries present)", binaries.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_not_root_checked_first() {
        let err = verify(false, Path::new("/nonexistent/efi"), &["sh"]).unwrap_err();
        assert!(matches!(err, InstallError::NotRoot));
    }

    #[test]
    fn test_missing_efi_dir() {
        let err = verify(true, Path::new("/nonexistent/efi"), &["sh"]).unwrap_err();
        assert!(matches!(err, InstallError::NotUefi { ref path } if path == "/nonexistent/efi"));
    }

    #[test]
    fn test_missing_binaries_reported() {
        let efi = TempDir::new().unwrap();
        let err = verify(true, efi.path(), &["sh", "cachyinstall-no-such-tool"]).unwrap_err();
        match err {
            InstallError::MissingBinaries(names) => {
                assert_eq!(names, vec!["cachyinstall-no-such-tool"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_all_checks_pass() {
        let efi = TempDir::new().unwrap();
        assert!(verify(true, efi.path(), &["sh"]).is_ok());
    }

    #[test]
    fn test_required_binaries_follow_config() {
        let fat = required_binaries(BootFilesystem::Fat32, false);
        assert!(fat.contains(&"mkfs.vfat"));
        assert!(!fat.contains(&"sudo"));

        let ext4 = required_binaries(BootFilesystem::Ext4, true);
        assert!(ext4.contains(&"mkfs.ext4"));
        assert!(ext4.contains(&"sudo"));
    }
}
