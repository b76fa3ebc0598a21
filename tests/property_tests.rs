//! Property-based tests for the planning layer
//!
//! These tests verify:
//! - Partition naming follows the device family
//! - Mount plan and fstab agree on the subvolume table
//! - The compression level appears identically everywhere
//! - The package builder is deterministic and adds networkmanager only headless
//! - Configuration file values beat prompts

use proptest::prelude::*;
use strum::IntoEnumIterator;

use cachyinstall::config::{ConfigDraft, ConfigField};
use cachyinstall::config_file::parse_config;
use cachyinstall::engine::storage::{self, StorageOp};
use cachyinstall::engine::{fstab, subvolumes};
use cachyinstall::logic::{packages, resolver};
use cachyinstall::prompt::Prompter;
use cachyinstall::{BootFilesystem, Bootloader, DesktopEnvironment, Initramfs, Kernel};

// =============================================================================
// Strategies
// =============================================================================

fn sata_disk() -> impl Strategy<Value = String> {
    "(sd|vd|hd)[a-z]{1,2}".prop_map(|name| format!("/dev/{name}"))
}

fn nvme_disk() -> impl Strategy<Value = String> {
    (0u8..8, 1u8..4).prop_map(|(ctrl, ns)| format!("/dev/nvme{ctrl}n{ns}"))
}

fn desktop_strategy() -> impl Strategy<Value = DesktopEnvironment> {
    proptest::sample::select(DesktopEnvironment::iter().collect::<Vec<_>>())
}

fn kernel_strategy() -> impl Strategy<Value = Kernel> {
    proptest::sample::select(Kernel::iter().collect::<Vec<_>>())
}

fn bootloader_strategy() -> impl Strategy<Value = Bootloader> {
    proptest::sample::select(Bootloader::iter().collect::<Vec<_>>())
}

fn initramfs_strategy() -> impl Strategy<Value = Initramfs> {
    proptest::sample::select(Initramfs::iter().collect::<Vec<_>>())
}

fn complete_draft() -> ConfigDraft {
    ConfigDraft {
        target_disk: Some("/dev/sda".into()),
        boot_fs: Some(BootFilesystem::Fat32),
        hostname: Some("cachyos".into()),
        timezone: Some("UTC".into()),
        keymap: Some("us".into()),
        locale: Some("en_US.UTF-8".into()),
        username: Some("user".into()),
        user_password: Some("pw".into()),
        root_password: Some("rootpw".into()),
        desktop: Some(DesktopEnvironment::None),
        kernel: Some(Kernel::Bore),
        initramfs: Some(Initramfs::Mkinitcpio),
        bootloader: Some(Bootloader::Grub),
        compression_level: Some(3),
        gaming: Some(false),
        ..Default::default()
    }
}

/// Answers every prompt with the same text and counts the calls.
struct ConstantPrompter {
    answer: String,
    calls: usize,
}

impl Prompter for ConstantPrompter {
    fn text(&mut self, _label: &str) -> cachyinstall::Result<String> {
        self.calls += 1;
        Ok(self.answer.clone())
    }
    fn secret(&mut self, _label: &str) -> cachyinstall::Result<String> {
        self.calls += 1;
        Ok(self.answer.clone())
    }
    fn select(
        &mut self,
        _label: &str,
        options: &[String],
        default: usize,
    ) -> cachyinstall::Result<String> {
        self.calls += 1;
        Ok(options[default].clone())
    }
    fn confirm(&mut self, _label: &str, default: bool) -> cachyinstall::Result<bool> {
        self.calls += 1;
        Ok(default)
    }
}

// =============================================================================
// Partition naming
// =============================================================================

proptest! {
    #[test]
    fn sata_partitions_append_digit(disk in sata_disk()) {
        let layout = storage::partition_paths(&disk);
        prop_assert_eq!(layout.boot, format!("{disk}1"));
        prop_assert_eq!(layout.root, format!("{disk}2"));
    }

    #[test]
    fn nvme_partitions_use_p_separator(disk in nvme_disk()) {
        let layout = storage::partition_paths(&disk);
        prop_assert_eq!(layout.boot, format!("{disk}p1"));
        prop_assert_eq!(layout.root, format!("{disk}p2"));
    }
}

// =============================================================================
// Subvolume table and compression
// =============================================================================

proptest! {
    /// Every Btrfs mount in the plan has exactly one fstab line with the
    /// same subvolume and mountpoint.
    #[test]
    fn mount_plan_matches_fstab(level in 0u8..=22) {
        let layout = storage::partition_paths("/dev/sda");
        let plan = storage::plan_mount(&layout, level);
        let fstab_text = fstab::render("uuid", level);

        let mut mounted = Vec::new();
        for op in &plan.ops {
            if let StorageOp::Mount { target, options: Some(options), .. } = op {
                let subvol = options
                    .split(',')
                    .find_map(|o| o.strip_prefix("subvol="))
                    .unwrap()
                    .to_string();
                let mountpoint = target.strip_prefix(subvolumes::TARGET_ROOT).unwrap();
                let mountpoint = if mountpoint.is_empty() { "/" } else { mountpoint };
                mounted.push((subvol, mountpoint.to_string()));
            }
        }

        let listed: Vec<(String, String)> = fstab_text
            .lines()
            .skip(1)
            .map(|line| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                let subvol = fields[3].rsplit("subvol=").next().unwrap().to_string();
                (subvol, fields[1].to_string())
            })
            .collect();

        prop_assert_eq!(mounted.len(), subvolumes::SUBVOLUMES.len());
        prop_assert_eq!(mounted, listed);
    }

    #[test]
    fn compression_level_is_literal_everywhere(level in 0u8..=22) {
        let options = subvolumes::compression_options(level);
        prop_assert_eq!(
            options,
            format!("compress=zstd:{level},compress-force=zstd:{level}")
        );

        let fstab_text = fstab::render("uuid", level);
        let needle = format!("compress=zstd:{level},");
        for line in fstab_text.lines().skip(1) {
            prop_assert!(line.contains(&needle));
        }
    }
}

// =============================================================================
// Package builder
// =============================================================================

proptest! {
    #[test]
    fn network_manager_only_when_headless(
        desktop in desktop_strategy(),
        kernel in kernel_strategy(),
        bootloader in bootloader_strategy(),
        initramfs in initramfs_strategy(),
    ) {
        let mut draft = complete_draft();
        draft.desktop = Some(desktop);
        draft.kernel = Some(kernel);
        draft.bootloader = Some(bootloader);
        draft.initramfs = Some(initramfs);
        let config = draft.finalize().unwrap();

        let first = packages::base_packages(&config);
        let second = packages::base_packages(&config);
        prop_assert_eq!(&first, &second);

        let has_nm = first.iter().any(|p| p == "networkmanager");
        prop_assert_eq!(has_nm, desktop.is_headless());
        prop_assert_eq!(first[0].as_str(), "base");
    }

    #[test]
    fn extra_packages_are_appended_verbatim(
        extras in proptest::collection::vec("[a-z][a-z0-9-]{1,12}", 0..6),
    ) {
        let mut draft = complete_draft();
        draft.extra_packages = extras.clone();
        let config = draft.finalize().unwrap();

        let list = packages::base_packages(&config);
        prop_assert!(list.ends_with(&extras));
    }
}

// =============================================================================
// Resolver precedence
// =============================================================================

proptest! {
    /// A hostname from the file is never replaced by a prompt answer.
    /// The level is preset since a free-text answer would not parse as one.
    #[test]
    fn file_value_wins_over_prompt(
        file_host in "[a-z][a-z0-9]{0,15}",
        prompt_host in "[a-z][a-z0-9]{0,15}",
    ) {
        let mut draft = parse_config(&format!("hostname={file_host}\ncompression_level=3\n")).unwrap();
        let mut prompter = ConstantPrompter { answer: prompt_host, calls: 0 };
        let asked = resolver::fill_missing(&mut draft, &mut prompter).unwrap();

        prop_assert_eq!(draft.hostname.as_deref(), Some(file_host.as_str()));
        prop_assert!(!asked.contains(&ConfigField::Hostname));
        prop_assert_eq!(prompter.calls, asked.len());
    }
}
