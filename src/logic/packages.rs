//! Package set builder.
//!
//! Resolves configuration choices into concrete package names and the
//! command text that installs them. Nothing here runs a command.

use crate::config::InstallConfig;
use crate::engine::subvolumes::TARGET_ROOT;
use crate::executor::SystemCommand;
use crate::profiles::{
    self, BASE_PACKAGES, GAMING_PACKAGE, NETWORK_MANAGER_PACKAGE, NETWORK_MANAGER_SERVICE,
};
use crate::types::DesktopEnvironment;

/// pacman invocation used inside the chroot
pub const PACMAN_INSTALL: &str = "pacman -S --noconfirm --needed --disable-download-timeout";

/// Packages passed to pacstrap, in install order.
///
/// The built-in set is de-duplicated keeping first occurrence; extra packages
/// from the user's list are appended verbatim.
pub fn base_packages(config: &InstallConfig) -> Vec<String> {
    let mut packages: Vec<&str> = Vec::new();
    let mut push = |name: &'static str| {
        if !packages.contains(&name) {
            packages.push(name);
        }
    };

    push(BASE_PACKAGES[0]);
    push(profiles::kernel_package(config.kernel));
    BASE_PACKAGES[1..].iter().copied().for_each(&mut push);
    profiles::bootloader_packages(config.bootloader)
        .iter()
        .copied()
        .for_each(&mut push);
    push(profiles::initramfs_package(config.initramfs));
    if config.desktop.is_headless() {
        push(NETWORK_MANAGER_PACKAGE);
    }

    packages
        .into_iter()
        .map(String::from)
        .chain(config.extra_packages.iter().cloned())
        .collect()
}

/// `pacstrap /mnt <packages> --needed --noconfirm --disable-download-timeout`
pub fn pacstrap_command(packages: &[String]) -> SystemCommand {
    SystemCommand::new("pacstrap")
        .arg(TARGET_ROOT)
        .args(packages.iter().cloned())
        .args(["--needed", "--noconfirm", "--disable-download-timeout"])
}

/// Everything the chroot script needs to bring up one desktop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesktopBlock {
    /// Meta-packages, display manager and network stack
    pub packages: Vec<String>,
    /// Units to enable (display manager first)
    pub services: Vec<String>,
    /// Default applications installed after the desktop
    pub apps: Vec<String>,
    /// Extra shell lines for this desktop
    pub tweaks: Vec<String>,
}

impl DesktopBlock {
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.services.is_empty() && self.apps.is_empty()
    }
}

/// Package group and enablement for a desktop. Empty for `None`.
pub fn desktop_package_block(desktop: DesktopEnvironment) -> DesktopBlock {
    let Some(profile) = profiles::desktop_profile(desktop) else {
        return DesktopBlock::default();
    };

    let mut packages: Vec<String> = profile.packages.iter().map(|p| p.to_string()).collect();
    packages.push(profile.display_manager.to_string());
    packages.push(NETWORK_MANAGER_PACKAGE.to_string());

    DesktopBlock {
        packages,
        services: vec![
            profile.display_manager.to_string(),
            NETWORK_MANAGER_SERVICE.to_string(),
        ],
        apps: profile.apps.iter().map(|p| p.to_string()).collect(),
        tweaks: profile.tweaks.iter().map(|t| t.to_string()).collect(),
    }
}

/// Gaming bundle, only offered on top of a desktop
pub fn gaming_packages(config: &InstallConfig) -> Vec<String> {
    if config.gaming && !config.desktop.is_headless() {
        vec![GAMING_PACKAGE.to_string()]
    } else {
        Vec::new()
    }
}

/// Shell line installing `packages` with pacman, or `None` for an empty set
pub fn pacman_install_line(packages: &[String]) -> Option<String> {
    if packages.is_empty() {
        None
    } else {
        Some(format!("{} {}", PACMAN_INSTALL, shell_words::join(packages)))
    }
}
