//! Btrfs subvolume layout.
//!
//! One table drives both the mount plan (`storage::plan_mount`) and the fstab
//! appendix (`fstab::render`), so the two can never disagree about which
//! subvolume lives where.

/// Scratch mountpoint for the target filesystem
pub const TARGET_ROOT: &str = "/mnt";

/// Mountpoint of the boot partition, relative to the target root
pub const BOOT_MOUNTPOINT: &str = "/boot/efi";

/// Name of the subvolume mounted at `/`
pub const ROOT_SUBVOLUME: &str = "@";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subvolume {
    /// Subvolume name as created under the top-level subvolume
    pub name: &'static str,
    /// Mountpoint inside the installed system
    pub mountpoint: &'static str,
}

impl Subvolume {
    /// Mountpoint under the scratch mount, e.g. `/mnt/var/log`
    pub fn target_path(&self) -> String {
        target_path(self.mountpoint)
    }

    pub fn is_root(&self) -> bool {
        self.name == ROOT_SUBVOLUME
    }
}

/// The canonical layout, root first.
pub const SUBVOLUMES: &[Subvolume] = &[
    Subvolume { name: "@", mountpoint: "/" },
    Subvolume { name: "@home", mountpoint: "/home" },
    Subvolume { name: "@root", mountpoint: "/root" },
    Subvolume { name: "@srv", mountpoint: "/srv" },
    Subvolume { name: "@cache", mountpoint: "/var/cache" },
    Subvolume { name: "@tmp", mountpoint: "/var/tmp" },
    Subvolume { name: "@log", mountpoint: "/var/log" },
];

/// Every subvolume except `@`, in table order
pub fn nested() -> impl Iterator<Item = &'static Subvolume> {
    SUBVOLUMES.iter().filter(|s| !s.is_root())
}

/// Map an installed-system path onto the scratch mount.
pub fn target_path(mountpoint: &str) -> String {
    if mountpoint == "/" {
        TARGET_ROOT.to_string()
    } else {
        format!("{}{}", TARGET_ROOT, mountpoint)
    }
}

/// `compress=zstd:N,compress-force=zstd:N`
pub fn compression_options(level: u8) -> String {
    format!("compress=zstd:{level},compress-force=zstd:{level}")
}

/// Mount options for one subvolume at the given zstd level.
pub fn mount_options(name: &str, level: u8) -> String {
    format!("subvol={},{}", name, compression_options(level))
}
