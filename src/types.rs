//! Type-safe catalog types for the installer
//!
//! Every choice that drives package names or generated script text is a
//! closed enum here. Parsing is case-insensitive and an unrecognized value is
//! an error, never an empty fragment further down the pipeline.

use crate::config::ConfigField;
use crate::error::{InstallError, Result};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Filesystem for the EFI boot partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum BootFilesystem {
    #[default]
    #[strum(to_string = "fat32", serialize = "vfat")]
    Fat32,
    #[strum(to_string = "ext4")]
    Ext4,
}

impl BootFilesystem {
    /// Filesystem type column used in fstab
    pub const fn fstab_type(self) -> &'static str {
        match self {
            Self::Fat32 => "vfat",
            Self::Ext4 => "ext4",
        }
    }

    /// Mount options column used in fstab
    pub const fn fstab_options(self) -> &'static str {
        match self {
            Self::Fat32 => "umask=0077",
            Self::Ext4 => "defaults",
        }
    }
}

/// Desktop environment selection ("None" means a headless install)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum DesktopEnvironment {
    #[default]
    #[strum(to_string = "KDE Plasma", serialize = "kde", serialize = "plasma")]
    KdePlasma,
    #[strum(to_string = "GNOME")]
    Gnome,
    #[strum(to_string = "XFCE")]
    Xfce,
    #[strum(to_string = "MATE")]
    Mate,
    #[strum(to_string = "LXQt")]
    Lxqt,
    #[strum(to_string = "Cinnamon")]
    Cinnamon,
    #[strum(to_string = "Budgie")]
    Budgie,
    #[strum(to_string = "Deepin")]
    Deepin,
    #[strum(to_string = "i3")]
    I3,
    #[strum(to_string = "Sway")]
    Sway,
    #[strum(to_string = "Hyprland")]
    Hyprland,
    #[strum(to_string = "None")]
    None,
}

impl DesktopEnvironment {
    /// True when no graphical environment is installed
    pub const fn is_headless(self) -> bool {
        matches!(self, Self::None)
    }
}

/// Kernel variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Kernel {
    #[default]
    #[strum(to_string = "Bore")]
    Bore,
    #[strum(to_string = "Bore-Extra")]
    BoreExtra,
    #[strum(to_string = "CachyOS")]
    Cachyos,
    #[strum(to_string = "CachyOS-Extra")]
    CachyosExtra,
    #[strum(to_string = "LTS")]
    Lts,
    #[strum(to_string = "Zen")]
    Zen,
}

/// Initramfs generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Initramfs {
    #[default]
    #[strum(to_string = "mkinitcpio")]
    Mkinitcpio,
    #[strum(to_string = "dracut")]
    Dracut,
    #[strum(to_string = "booster")]
    Booster,
    #[strum(to_string = "mkinitcpio-pico")]
    MkinitcpioPico,
}

/// Bootloader selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Bootloader {
    #[default]
    #[strum(to_string = "GRUB")]
    Grub,
    #[strum(to_string = "systemd-boot", serialize = "systemdboot")]
    SystemdBoot,
    #[strum(to_string = "rEFInd")]
    Refind,
}

/// Parse a catalog value, naming the field in the error.
pub fn parse_choice<T: FromStr>(field: ConfigField, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| InstallError::UnknownValue {
            field,
            value: value.trim().to_string(),
        })
}

/// Display names of every catalog entry, in menu order.
pub fn choices<T: IntoEnumIterator + ToString>() -> Vec<String> {
    T::iter().map(|v| v.to_string()).collect()
}
