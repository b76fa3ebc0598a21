//! Static package catalog.
//!
//! Package lists live here as constants so that typos surface in tests and
//! the builders in `logic::packages` never contain literal package names.
//!
//! # Desktop Profiles
//!
//! | Desktop    | Display Manager |
//! |------------|-----------------|
//! | KDE Plasma | sddm            |
//! | GNOME      | gdm             |
//! | LXQt       | sddm            |
//! | (others)   | lightdm         |
//! | None       | -               |

use crate::types::{Bootloader, DesktopEnvironment, Initramfs, Kernel};

/// Installed by pacstrap on every system (kernel is inserted after `base`)
pub const BASE_PACKAGES: &[&str] = &[
    "base",
    "linux-firmware",
    "sudo",
    "dosfstools",
    "arch-install-scripts",
    "btrfs-progs",
    "nano",
];

/// Network stack for headless installs, also pulled in by desktop blocks
pub const NETWORK_MANAGER_PACKAGE: &str = "networkmanager";

/// systemd unit shipped by `networkmanager`
pub const NETWORK_MANAGER_SERVICE: &str = "NetworkManager";

/// Optional gaming bundle offered for desktop installs
pub const GAMING_PACKAGE: &str = "cachyos-gaming-meta";

/// Kernel package for each kernel variant.
pub const fn kernel_package(kernel: Kernel) -> &'static str {
    match kernel {
        Kernel::Bore => "linux-cachyos-bore",
        Kernel::BoreExtra => "linux-cachyos-bore-extra",
        Kernel::Cachyos => "linux-cachyos",
        Kernel::CachyosExtra => "linux-cachyos-extra",
        Kernel::Lts => "linux-lts",
        Kernel::Zen => "linux-zen",
    }
}

pub const fn bootloader_packages(bootloader: Bootloader) -> &'static [&'static str] {
    match bootloader {
        Bootloader::Grub => &["grub", "efibootmgr", "dosfstools", "cachyos-grub-theme"],
        Bootloader::SystemdBoot => &["efibootmgr"],
        Bootloader::Refind => &["refind"],
    }
}

pub const fn initramfs_package(initramfs: Initramfs) -> &'static str {
    match initramfs {
        Initramfs::Mkinitcpio => "mkinitcpio",
        Initramfs::Dracut => "dracut",
        Initramfs::Booster => "booster",
        Initramfs::MkinitcpioPico => "mkinitcpio-pico",
    }
}

/// Package group, login manager and default applications for one desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesktopProfile {
    /// Desktop meta-packages
    pub packages: &'static [&'static str],
    /// Display/login manager package, which is also its systemd unit
    pub display_manager: &'static str,
    /// Browser, terminal, editor and audio controls
    pub apps: &'static [&'static str],
    /// Extra shell lines run after the apps are installed
    pub tweaks: &'static [&'static str],
}

/// Catalog entry for a desktop, `None` for a headless install.
pub const fn desktop_profile(desktop: DesktopEnvironment) -> Option<DesktopProfile> {
    let profile = match desktop {
        DesktopEnvironment::KdePlasma => DesktopProfile {
            packages: &[
                "plasma-desktop",
                "qt6-base",
                "qt6-wayland",
                "wayland",
                "kde-applications-meta",
                "cachyos-kde-settings",
                "ntfs-3g",
                "gtk3",
            ],
            display_manager: "sddm",
            apps: &[
                "firefox",
                "kate",
                "ksystemlog",
                "partitionmanager",
                "dolphin",
                "konsole",
                "pulseaudio",
                "pavucontrol",
            ],
            tweaks: &["echo 'blacklist ntfs3' | tee /etc/modprobe.d/disable-ntfs3.conf"],
        },
        DesktopEnvironment::Gnome => DesktopProfile {
            packages: &["gnome", "gnome-extra"],
            display_manager: "gdm",
            apps: &["firefox", "gnome-terminal", "pulseaudio", "pavucontrol"],
            tweaks: &[],
        },
        DesktopEnvironment::Xfce => DesktopProfile {
            packages: &["xfce4", "xfce4-goodies", "lightdm-gtk-greeter"],
            display_manager: "lightdm",
            apps: &["firefox", "mousepad", "xfce4-terminal", "pulseaudio", "pavucontrol"],
            tweaks: &[],
        },
        DesktopEnvironment::Mate => DesktopProfile {
            packages: &["mate", "mate-extra", "mate-media", "lightdm-gtk-greeter"],
            display_manager: "lightdm",
            apps: &["firefox", "pluma", "mate-terminal", "pulseaudio", "pavucontrol"],
            tweaks: &[],
        },
        DesktopEnvironment::Lxqt => DesktopProfile {
            packages: &["lxqt", "breeze-icons"],
            display_manager: "sddm",
            apps: &["firefox", "qterminal", "pulseaudio", "pavucontrol"],
            tweaks: &[],
        },
        DesktopEnvironment::Cinnamon => DesktopProfile {
            packages: &["cinnamon", "cinnamon-translations", "lightdm-gtk-greeter"],
            display_manager: "lightdm",
            apps: &["firefox", "xed", "gnome-terminal", "pulseaudio", "pavucontrol"],
            tweaks: &[],
        },
        DesktopEnvironment::Budgie => DesktopProfile {
            packages: &[
                "budgie-desktop",
                "budgie-extras",
                "gnome-control-center",
                "gnome-terminal",
                "lightdm-gtk-greeter",
            ],
            display_manager: "lightdm",
            apps: &[
                "firefox",
                "gnome-text-editor",
                "gnome-terminal",
                "pulseaudio",
                "pavucontrol",
            ],
            tweaks: &[],
        },
        DesktopEnvironment::Deepin => DesktopProfile {
            packages: &["deepin", "deepin-extra"],
            display_manager: "lightdm",
            apps: &["firefox", "deepin-terminal", "pulseaudio", "pavucontrol"],
            tweaks: &[],
        },
        DesktopEnvironment::I3 => DesktopProfile {
            packages: &["i3-wm", "i3status", "i3lock", "dmenu", "lightdm-gtk-greeter"],
            display_manager: "lightdm",
            apps: &["firefox", "alacritty", "pulseaudio", "pavucontrol"],
            tweaks: &[],
        },
        DesktopEnvironment::Sway => DesktopProfile {
            packages: &["sway", "swaylock", "swayidle", "waybar", "wofi", "lightdm-gtk-greeter"],
            display_manager: "lightdm",
            apps: &["firefox", "foot", "pulseaudio", "pavucontrol"],
            tweaks: &[],
        },
        DesktopEnvironment::Hyprland => DesktopProfile {
            packages: &[
                "hyprland",
                "waybar",
                "rofi",
                "wofi",
                "kitty",
                "swaybg",
                "swaylock-effects",
                "wl-clipboard",
                "lightdm-gtk-greeter",
            ],
            display_manager: "lightdm",
            apps: &["firefox", "kitty", "pulseaudio", "pavucontrol"],
            tweaks: &[],
        },
        DesktopEnvironment::None => return None,
    };
    Some(profile)
}

/// Starter compositor configuration written for Hyprland users
pub const HYPRLAND_CONFIG: &str = "\
exec-once = waybar &
exec-once = swaybg -i ~/wallpaper.jpg &
monitor=,preferred,auto,1
input {
    kb_layout = us
    follow_mouse = 1
    touchpad { natural_scroll = yes }
}
general {
    gaps_in = 5
    gaps_out = 10
    border_size = 2
    col.active_border = rgba(33ccffee) rgba(00ff99ee) 45deg
    col.inactive_border = rgba(595959aa)
}
decoration {
    rounding = 5
    blur = yes
    blur_size = 3
    blur_passes = 1
}
animations {
    enabled = yes
    bezier = myBezier, 0.05, 0.9, 0.1, 1.05
    animation = windows, 1, 7, myBezier
    animation = windowsOut, 1, 7, default, popin 80%
    animation = border, 1, 10, default
    animation = fade, 1, 7, default
    animation = workspaces, 1, 6, default
}
bind = SUPER, Return, exec, kitty
bind = SUPER, Q, killactive
bind = SUPER, M, exit
bind = SUPER, V, togglefloating
bind = SUPER, F, fullscreen
bind = SUPER, D, exec, rofi -show drun
bind = SUPER, P, pseudo
bind = SUPER, J, togglesplit
";

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_desktop_except_none_has_profile() {
        for desktop in DesktopEnvironment::iter() {
            let profile = desktop_profile(desktop);
            assert_eq!(
                profile.is_none(),
                desktop == DesktopEnvironment::None,
                "{desktop} profile presence"
            );
            if let Some(profile) = profile {
                assert!(!profile.packages.is_empty(), "{desktop} has no packages");
                assert!(profile.apps.contains(&"firefox"), "{desktop} has no browser");
            }
        }
    }

    #[test]
    fn test_display_managers() {
        let dm = |d| desktop_profile(d).map(|p| p.display_manager);
        assert_eq!(dm(DesktopEnvironment::KdePlasma), Some("sddm"));
        assert_eq!(dm(DesktopEnvironment::Gnome), Some("gdm"));
        assert_eq!(dm(DesktopEnvironment::Lxqt), Some("sddm"));
        assert_eq!(dm(DesktopEnvironment::Hyprland), Some("lightdm"));
        assert_eq!(dm(DesktopEnvironment::None), None);
    }

    #[test]
    fn test_kernel_packages_are_distinct() {
        let mut names: Vec<_> = Kernel::iter().map(kernel_package).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Kernel::iter().count());
        assert!(names.iter().all(|n| n.starts_with("linux-")));
    }

    #[test]
    fn test_grub_packages() {
        let packages = bootloader_packages(Bootloader::Grub);
        assert!(packages.contains(&"grub"));
        assert!(packages.contains(&"efibootmgr"));
        assert!(packages.contains(&"cachyos-grub-theme"));
    }

    #[test]
    fn test_kde_tweaks_present() {
        let kde = desktop_profile(DesktopEnvironment::KdePlasma).unwrap();
        assert!(kde.tweaks.iter().any(|t| t.contains("blacklist ntfs3")));
    }

    /// Tweaks run under `set -e`, so they may only call tools from the
    /// base system; a missing plymouth would abort the whole script.
    #[test]
    fn test_tweaks_use_only_base_tools() {
        const BASE_TOOLS: &[&str] = &["echo", "tee"];
        for desktop in DesktopEnvironment::iter() {
            let Some(profile) = desktop_profile(desktop) else {
                continue;
            };
            for tweak in profile.tweaks {
                for stage in tweak.split('|') {
                    let program = stage.split_whitespace().next().unwrap_or_default();
                    assert!(
                        BASE_TOOLS.contains(&program),
                        "{desktop} tweak calls {program}: {tweak}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_hyprland_config_binds_terminal() {
        assert!(HYPRLAND_CONFIG.contains("bind = SUPER, Return, exec, kitty"));
        assert!(HYPRLAND_CONFIG.ends_with('\n'));
    }
}
