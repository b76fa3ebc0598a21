//! Storage Stack Engine
//!
//! Translates the target disk, boot filesystem and compression level into
//! ordered sequences of atomic `StorageOp` operations. The installer turns
//! each op into a `SystemCommand` and runs it through the executor.
//!
//! # Disk Layout
//!
//! | Partition | Size          | Contents                    |
//! |-----------|---------------|-----------------------------|
//! | 1         | 1MiB..513MiB  | ESP, FAT32 or ext4          |
//! | 2         | 513MiB..100%  | Btrfs with seven subvolumes |
//!
//! # Stages
//!
//! | Plan               | Operations Generated |
//! |--------------------|---------------------|
//! | `plan_partition`   | Wipe → GPT label → ESP → ESP flag → root |
//! | `plan_format`      | Format boot → Format Btrfs |
//! | `plan_subvolumes`  | Mount top-level → Create x7 → Unmount |
//! | `plan_mount`       | Mount `@` → Mount ESP → Mount nested subvolumes |
//!
//! # Design
//!
//! - **Pure logic**: No I/O, no side effects; only generates the plan
//! - **Typed output**: Each `StorageOp` maps to exactly one command
//! - **Shared layout**: subvolume names and mountpoints come from `subvolumes::SUBVOLUMES`

use crate::engine::subvolumes::{self, BOOT_MOUNTPOINT, SUBVOLUMES, TARGET_ROOT};
use crate::executor::SystemCommand;
use crate::types::BootFilesystem;
use std::fmt;

// ============================================================================
// Storage Operation Types
// ============================================================================

/// A single atomic storage operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    /// Remove filesystem/partition-table signatures (wipefs -a)
    WipeSignatures { disk: String },

    /// Write a fresh GPT label
    CreateGptLabel { disk: String },

    /// Create a primary partition between two parted offsets
    CreatePartition {
        disk: String,
        start: &'static str,
        end: &'static str,
    },

    /// Mark partition 1 as the EFI System Partition
    SetEspFlag { disk: String },

    /// Format the boot partition
    FormatBoot { device: String, fs: BootFilesystem },

    /// Force-create a Btrfs filesystem on the root partition
    FormatBtrfs { device: String },

    /// Mount a device, optionally with `-o` options
    Mount {
        device: String,
        target: String,
        options: Option<String>,
    },

    /// Create a mountpoint directory (mkdir -p)
    MakeDir { path: String },

    /// Create a subvolume under the mounted top-level subvolume
    CreateSubvolume { path: String },

    /// Unmount a target, recursively if requested
    Unmount { target: String, recursive: bool },
}

impl StorageOp {
    /// Command line that performs this operation.
    pub fn to_command(&self) -> SystemCommand {
        match self {
            Self::WipeSignatures { disk } => SystemCommand::new("wipefs").args(["-a", disk]),
            Self::CreateGptLabel { disk } => {
                SystemCommand::new("parted").args(["-s", disk, "mklabel", "gpt"])
            }
            Self::CreatePartition { disk, start, end } => SystemCommand::new("parted")
                .args(["-s", disk, "mkpart", "primary", start, end]),
            Self::SetEspFlag { disk } => {
                SystemCommand::new("parted").args(["-s", disk, "set", "1", "esp", "on"])
            }
            Self::FormatBoot { device, fs } => match fs {
                BootFilesystem::Fat32 => SystemCommand::new("mkfs.vfat").args(["-F32", device]),
                BootFilesystem::Ext4 => SystemCommand::new("mkfs.ext4").args(["-F", device]),
            },
            Self::FormatBtrfs { device } => SystemCommand::new("mkfs.btrfs").args(["-f", device]),
            Self::Mount {
                device,
                target,
                options,
            } => {
                let mut cmd = SystemCommand::new("mount");
                if let Some(options) = options {
                    cmd = cmd.args(["-o", options]);
                }
                cmd.args([device, target])
            }
            Self::MakeDir { path } => SystemCommand::new("mkdir").args(["-p", path]),
            Self::CreateSubvolume { path } => {
                SystemCommand::new("btrfs").args(["subvolume", "create", path])
            }
            Self::Unmount { target, recursive } => {
                let mut cmd = SystemCommand::new("umount");
                if *recursive {
                    cmd = cmd.arg("-R");
                }
                cmd.arg(target)
            }
        }
    }

    /// True for operations that destroy existing data on the disk
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::WipeSignatures { .. }
                | Self::CreateGptLabel { .. }
                | Self::CreatePartition { .. }
                | Self::FormatBoot { .. }
                | Self::FormatBtrfs { .. }
        )
    }
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WipeSignatures { disk } => write!(f, "WipeSignatures({})", disk),
            Self::CreateGptLabel { disk } => write!(f, "CreateGptLabel({})", disk),
            Self::CreatePartition { disk, start, end } => {
                write!(f, "CreatePartition({}, {}..{})", disk, start, end)
            }
            Self::SetEspFlag { disk } => write!(f, "SetEspFlag({}1)", disk),
            Self::FormatBoot { device, fs } => write!(f, "FormatBoot({}, fs={})", device, fs),
            Self::FormatBtrfs { device } => write!(f, "FormatBtrfs({})", device),
            Self::Mount {
                device,
                target,
                options,
            } => write!(f, "Mount({} -> {}, opts={:?})", device, target, options),
            Self::MakeDir { path } => write!(f, "MakeDir({})", path),
            Self::CreateSubvolume { path } => write!(f, "CreateSubvolume({})", path),
            Self::Unmount { target, recursive } => {
                write!(f, "Unmount({}, recursive={})", target, recursive)
            }
        }
    }
}

/// Boot and root partition device paths for a disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLayout {
    pub boot: String,
    pub root: String,
}

/// An ordered list of operations with a label for logs.
#[derive(Debug, Clone)]
pub struct StoragePlan {
    pub label: &'static str,
    pub ops: Vec<StorageOp>,
}

impl StoragePlan {
    pub fn commands(&self) -> Vec<SystemCommand> {
        self.ops.iter().map(StorageOp::to_command).collect()
    }

    pub fn is_destructive(&self) -> bool {
        self.ops.iter().any(StorageOp::is_destructive)
    }

    /// Returns a summary of the plan for logging/display.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("{} ({} operations):", self.label, self.ops.len())];
        for (i, op) in self.ops.iter().enumerate() {
            lines.push(format!("  {}. {}", i + 1, op));
        }
        lines.join("\n")
    }
}

// ============================================================================
// Plan Calculation
// ============================================================================

/// Derive partition paths from the disk path.
///
/// NVMe namespaces get a `p` separator (`/dev/nvme0n1` → `/dev/nvme0n1p1`);
/// everything else gets a bare number (`/dev/sda` → `/dev/sda1`).
pub fn partition_paths(disk: &str) -> PartitionLayout {
    let separator = if disk.contains("nvme") { "p" } else { "" };
    PartitionLayout {
        boot: format!("{disk}{separator}1"),
        root: format!("{disk}{separator}2"),
    }
}

/// Wipe the disk and lay out a GPT with an ESP and a root partition.
///
/// # What This Explicitly Refuses To Do
///
/// - Preserve existing partitions: the whole disk is relabelled
/// - Create swap: not part of the layout
pub fn plan_partition(disk: &str) -> StoragePlan {
    let disk = disk.to_string();
    StoragePlan {
        label: "Partitioning",
        ops: vec![
            StorageOp::WipeSignatures { disk: disk.clone() },
            StorageOp::CreateGptLabel { disk: disk.clone() },
            StorageOp::CreatePartition {
                disk: disk.clone(),
                start: "1MiB",
                end: "513MiB",
            },
            StorageOp::SetEspFlag { disk: disk.clone() },
            StorageOp::CreatePartition {
                disk,
                start: "513MiB",
                end: "100%",
            },
        ],
    }
}

/// Format the boot partition with the chosen filesystem and root as Btrfs.
pub fn plan_format(layout: &PartitionLayout, boot_fs: BootFilesystem) -> StoragePlan {
    StoragePlan {
        label: "Formatting",
        ops: vec![
            StorageOp::FormatBoot {
                device: layout.boot.clone(),
                fs: boot_fs,
            },
            StorageOp::FormatBtrfs {
                device: layout.root.clone(),
            },
        ],
    }
}

/// Create every subvolume while the top-level subvolume is mounted.
pub fn plan_subvolumes(root: &str) -> StoragePlan {
    let mut ops = vec![StorageOp::Mount {
        device: root.to_string(),
        target: TARGET_ROOT.to_string(),
        options: None,
    }];
    ops.extend(SUBVOLUMES.iter().map(|subvol| StorageOp::CreateSubvolume {
        path: format!("{}/{}", TARGET_ROOT, subvol.name),
    }));
    ops.push(StorageOp::Unmount {
        target: TARGET_ROOT.to_string(),
        recursive: false,
    });

    StoragePlan {
        label: "Creating subvolumes",
        ops,
    }
}

/// Mount `@` at the target root, then the ESP, then every nested subvolume,
/// all Btrfs mounts carrying the same zstd level.
pub fn plan_mount(layout: &PartitionLayout, compression_level: u8) -> StoragePlan {
    let mut ops = vec![StorageOp::Mount {
        device: layout.root.clone(),
        target: TARGET_ROOT.to_string(),
        options: Some(subvolumes::mount_options(
            subvolumes::ROOT_SUBVOLUME,
            compression_level,
        )),
    }];

    let boot_target = subvolumes::target_path(BOOT_MOUNTPOINT);
    ops.push(StorageOp::MakeDir {
        path: boot_target.clone(),
    });
    ops.push(StorageOp::Mount {
        device: layout.boot.clone(),
        target: boot_target,
        options: None,
    });

    for subvol in subvolumes::nested() {
        let target = subvol.target_path();
        ops.push(StorageOp::MakeDir {
            path: target.clone(),
        });
        ops.push(StorageOp::Mount {
            device: layout.root.clone(),
            target,
            options: Some(subvolumes::mount_options(subvol.name, compression_level)),
        });
    }

    StoragePlan {
        label: "Mounting with compression",
        ops,
    }
}

/// Recursively unmount everything under the target root.
pub fn unmount_all() -> StorageOp {
    StorageOp::Unmount {
        target: TARGET_ROOT.to_string(),
        recursive: true,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(plan: &StoragePlan) -> Vec<String> {
        plan.commands().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_partition_paths_sata() {
        let layout = partition_paths("/dev/sda");
        assert_eq!(layout.boot, "/dev/sda1");
        assert_eq!(layout.root, "/dev/sda2");
    }

    #[test]
    fn test_partition_paths_nvme() {
        let layout = partition_paths("/dev/nvme0n1");
        assert_eq!(layout.boot, "/dev/nvme0n1p1");
        assert_eq!(layout.root, "/dev/nvme0n1p2");
    }

    #[test]
    fn test_partition_plan_order() {
        let plan = plan_partition("/dev/sda");
        assert_eq!(
            rendered(&plan),
            vec![
                "wipefs -a /dev/sda",
                "parted -s /dev/sda mklabel gpt",
                "parted -s /dev/sda mkpart primary 1MiB 513MiB",
                "parted -s /dev/sda set 1 esp on",
                "parted -s /dev/sda mkpart primary 513MiB '100%'",
            ]
        );
        assert!(plan.is_destructive());
    }

    #[test]
    fn test_format_plan_boot_fs() {
        let layout = partition_paths("/dev/sda");
        let fat = rendered(&plan_format(&layout, BootFilesystem::Fat32));
        assert_eq!(fat, vec!["mkfs.vfat -F32 /dev/sda1", "mkfs.btrfs -f /dev/sda2"]);

        let ext4 = rendered(&plan_format(&layout, BootFilesystem::Ext4));
        assert_eq!(ext4[0], "mkfs.ext4 -F /dev/sda1");
    }

    #[test]
    fn test_subvolumes_created_on_top_level_mount() {
        let plan = plan_subvolumes("/dev/sda2");
        let ops = &plan.ops;

        // Top-level mount carries no subvol= option
        assert_eq!(
            ops[0],
            StorageOp::Mount {
                device: "/dev/sda2".into(),
                target: "/mnt".into(),
                options: None,
            }
        );
        let created: Vec<_> = ops
            .iter()
            .filter_map(|op| match op {
                StorageOp::CreateSubvolume { path } => Some(path.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(created.len(), 7);
        assert!(created.contains(&"/mnt/@log"));
        assert!(matches!(ops.last(), Some(StorageOp::Unmount { recursive: false, .. })));
        assert!(!plan.is_destructive());
    }

    #[test]
    fn test_mount_plan_root_first_then_esp() {
        let layout = partition_paths("/dev/nvme0n1");
        let commands = rendered(&plan_mount(&layout, 3));

        assert_eq!(
            commands[0],
            "mount -o 'subvol=@,compress=zstd:3,compress-force=zstd:3' /dev/nvme0n1p2 /mnt"
        );
        assert_eq!(commands[1], "mkdir -p /mnt/boot/efi");
        assert_eq!(commands[2], "mount /dev/nvme0n1p1 /mnt/boot/efi");
        assert!(commands.contains(&"mkdir -p /mnt/var/log".to_string()));
    }

    #[test]
    fn test_mount_plan_covers_every_nested_subvolume() {
        let layout = partition_paths("/dev/sda");
        let plan = plan_mount(&layout, 7);
        let btrfs_mounts = plan
            .ops
            .iter()
            .filter(|op| matches!(op, StorageOp::Mount { options: Some(_), .. }))
            .count();
        assert_eq!(btrfs_mounts, SUBVOLUMES.len());
    }

    #[test]
    fn test_unmount_all_is_recursive() {
        assert_eq!(unmount_all().to_command().to_string(), "umount -R /mnt");
    }

    #[test]
    fn test_plan_summary_not_empty() {
        let summary = plan_partition("/dev/sda").summary();
        assert!(summary.starts_with("Partitioning (5 operations)"));
        assert!(summary.contains("WipeSignatures(/dev/sda)"));
    }
}
