//! Second-stage setup script.
//!
//! The script is built as an ordered list of typed sections and only turned
//! into text at the end, so tests can look at a section without grepping the
//! whole script. Every user-supplied value is passed through
//! `shell_words::quote` on its way into a command line; values inside quoted
//! heredocs are already validated by `InstallConfig::validate`.
//!
//! The script removes itself as its last action.

use std::borrow::Cow;
use std::fmt;

use shell_words::quote;

use crate::config::InstallConfig;
use crate::logic::packages::{self, DesktopBlock};
use crate::profiles::{HYPRLAND_CONFIG, NETWORK_MANAGER_SERVICE};
use crate::types::{Bootloader, DesktopEnvironment, Initramfs};

/// Where the installer writes the script on the host
pub const HOST_PATH: &str = "/mnt/setup-chroot.sh";

/// The same file as seen from inside the chroot
pub const CHROOT_PATH: &str = "/setup-chroot.sh";

/// Supplementary groups for the primary user
pub const USER_GROUPS: &str = "wheel,audio,video,storage,optical";

/// Sections in the order they appear in the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Hostname,
    Timezone,
    Locale,
    Keymap,
    RootPassword,
    User,
    Sudoers,
    Bootloader,
    Initramfs,
    Network,
    Desktop,
    Gaming,
    Cleanup,
}

impl SectionKind {
    pub const fn title(self) -> &'static str {
        match self {
            Self::Hostname => "Hostname",
            Self::Timezone => "Timezone",
            Self::Locale => "Locale",
            Self::Keymap => "Console keymap",
            Self::RootPassword => "Root password",
            Self::User => "User",
            Self::Sudoers => "Sudoers",
            Self::Bootloader => "Bootloader",
            Self::Initramfs => "Initramfs",
            Self::Network => "Network",
            Self::Desktop => "Desktop environment",
            Self::Gaming => "Gaming",
            Self::Cleanup => "Clean up",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSection {
    pub kind: SectionKind,
    /// Shell lines; a heredoc is a single multi-line entry
    pub lines: Vec<String>,
}

impl ScriptSection {
    fn new(kind: SectionKind, lines: Vec<String>) -> Self {
        Self { kind, lines }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChrootScript {
    pub sections: Vec<ScriptSection>,
}

impl ChrootScript {
    /// Build the script for `config`, booting `kernel_package` from the
    /// filesystem identified by `root_uuid`.
    pub fn build(config: &InstallConfig, kernel_package: &str, root_uuid: &str) -> Self {
        let mut sections = vec![
            ScriptSection::new(
                SectionKind::Hostname,
                vec![format!("echo {} > /etc/hostname", quote(&config.hostname))],
            ),
            ScriptSection::new(
                SectionKind::Timezone,
                vec![
                    format!(
                        "ln -sf {} /etc/localtime",
                        quote(&format!("/usr/share/zoneinfo/{}", config.timezone))
                    ),
                    "hwclock --systohc".to_string(),
                ],
            ),
            ScriptSection::new(
                SectionKind::Locale,
                vec![
                    format!(
                        "echo {} >> /etc/locale.gen",
                        quote(&locale_gen_entry(&config.locale))
                    ),
                    "locale-gen".to_string(),
                ],
            ),
            ScriptSection::new(
                SectionKind::Keymap,
                vec![format!(
                    "echo {} > /etc/vconsole.conf",
                    quote(&format!("KEYMAP={}", config.keymap))
                )],
            ),
            ScriptSection::new(
                SectionKind::RootPassword,
                vec![chpasswd_line("root", &config.root_password)],
            ),
            ScriptSection::new(
                SectionKind::User,
                vec![
                    format!(
                        "useradd -m -G {} -s /bin/bash {}",
                        USER_GROUPS,
                        quote(&config.username)
                    ),
                    chpasswd_line(&config.username, &config.user_password),
                ],
            ),
            ScriptSection::new(
                SectionKind::Sudoers,
                vec!["echo \"%wheel ALL=(ALL) ALL\" > /etc/sudoers.d/wheel".to_string()],
            ),
            ScriptSection::new(
                SectionKind::Bootloader,
                bootloader_lines(config.bootloader, kernel_package, root_uuid),
            ),
            ScriptSection::new(
                SectionKind::Initramfs,
                vec![initramfs_command(config.initramfs).to_string()],
            ),
        ];

        if config.desktop.is_headless() {
            sections.push(ScriptSection::new(
                SectionKind::Network,
                vec![
                    format!("systemctl enable {}", NETWORK_MANAGER_SERVICE),
                    format!("systemctl start {}", NETWORK_MANAGER_SERVICE),
                ],
            ));
        } else {
            let block = packages::desktop_package_block(config.desktop);
            sections.push(ScriptSection::new(
                SectionKind::Desktop,
                desktop_lines(config, &block),
            ));
        }

        if let Some(line) = packages::pacman_install_line(&packages::gaming_packages(config)) {
            sections.push(ScriptSection::new(SectionKind::Gaming, vec![line]));
        }

        sections.push(ScriptSection::new(
            SectionKind::Cleanup,
            vec![format!("rm {}", CHROOT_PATH)],
        ));

        Self { sections }
    }

    pub fn section(&self, kind: SectionKind) -> Option<&ScriptSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn kinds(&self) -> Vec<SectionKind> {
        self.sections.iter().map(|s| s.kind).collect()
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChrootScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#!/bin/bash")?;
        // A failing section must fail the arch-chroot call
        writeln!(f, "set -e")?;
        for section in &self.sections {
            writeln!(f)?;
            writeln!(f, "# {}", section.kind.title())?;
            for line in &section.lines {
                writeln!(f, "{}", line)?;
            }
        }
        Ok(())
    }
}

/// Render the script text in one call.
pub fn render(config: &InstallConfig, kernel_package: &str, root_uuid: &str) -> String {
    ChrootScript::build(config, kernel_package, root_uuid).render()
}

/// `en_GB.UTF-8` → `en_GB.UTF-8 UTF-8`, the format of `/etc/locale.gen`
fn locale_gen_entry(locale: &str) -> Cow<'_, str> {
    match locale.split_once('.') {
        Some((_, charset)) if !charset.is_empty() => Cow::Owned(format!("{locale} {charset}")),
        _ => Cow::Borrowed(locale),
    }
}

fn chpasswd_line(user: &str, password: &str) -> String {
    format!("echo {} | chpasswd", quote(&format!("{user}:{password}")))
}

fn heredoc(path: &str, tag: &str, body: &str) -> String {
    let body = body.strip_suffix('\n').unwrap_or(body);
    format!("cat > {path} << '{tag}'\n{body}\n{tag}")
}

fn bootloader_lines(bootloader: Bootloader, kernel_package: &str, root_uuid: &str) -> Vec<String> {
    let options = format!("root=UUID={root_uuid} rootflags=subvol=@ rw");
    match bootloader {
        Bootloader::Grub => vec![
            "grub-install --target=x86_64-efi --efi-directory=/boot/efi --bootloader-id=CachyOS"
                .to_string(),
            "grub-mkconfig -o /boot/grub/grub.cfg".to_string(),
        ],
        Bootloader::SystemdBoot => vec![
            "bootctl --path=/boot/efi install".to_string(),
            "mkdir -p /boot/efi/loader/entries".to_string(),
            heredoc(
                "/boot/efi/loader/loader.conf",
                "LOADER",
                "default arch\ntimeout 3\neditor  yes",
            ),
            heredoc(
                "/boot/efi/loader/entries/arch.conf",
                "ENTRY",
                &format!(
                    "title   CachyOS Linux\n\
                     linux   /vmlinuz-{kernel_package}\n\
                     initrd  /initramfs-{kernel_package}.img\n\
                     options {options}"
                ),
            ),
        ],
        Bootloader::Refind => vec![
            "refind-install".to_string(),
            "mkdir -p /boot/efi/EFI/refind".to_string(),
            heredoc(
                "/boot/efi/EFI/refind/refind.conf",
                "REFIND",
                &format!(
                    "menuentry \"CachyOS Linux\" {{\n    \
                     icon     /EFI/refind/icons/os_arch.png\n    \
                     loader   /vmlinuz-{kernel_package}\n    \
                     initrd   /initramfs-{kernel_package}.img\n    \
                     options  \"{options}\"\n}}"
                ),
            ),
        ],
    }
}

/// Command that regenerates the initramfs images
pub const fn initramfs_command(initramfs: Initramfs) -> &'static str {
    match initramfs {
        Initramfs::Mkinitcpio | Initramfs::MkinitcpioPico => "mkinitcpio -P",
        Initramfs::Dracut => "dracut --regenerate-all --force",
        Initramfs::Booster => "booster generate",
    }
}

fn desktop_lines(config: &InstallConfig, block: &DesktopBlock) -> Vec<String> {
    let mut lines = Vec::new();
    lines.extend(packages::pacman_install_line(&block.packages));
    lines.extend(
        block
            .services
            .iter()
            .map(|service| format!("systemctl enable {}", service)),
    );
    lines.push(format!("systemctl start {}", NETWORK_MANAGER_SERVICE));
    lines.extend(packages::pacman_install_line(&block.apps));
    lines.extend(block.tweaks.iter().cloned());

    if config.desktop == DesktopEnvironment::Hyprland {
        let home = format!("/home/{}", config.username);
        let config_dir = format!("{home}/.config");
        lines.push(format!("mkdir -p {}", quote(&format!("{config_dir}/hypr"))));
        lines.push(heredoc(
            &quote(&format!("{config_dir}/hypr/hyprland.conf")),
            "HYPRCONFIG",
            HYPRLAND_CONFIG,
        ));
        lines.push(format!(
            "chown -R {} {}",
            quote(&format!("{0}:{0}", config.username)),
            quote(&config_dir)
        ));
    }

    lines
}
