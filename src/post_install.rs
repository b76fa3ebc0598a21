//! Post-install menu: reboot, drop into the new system, or exit.

use strum::{Display, EnumIter, EnumString};
use tracing::info;

use crate::config::InstallConfig;
use crate::engine::storage::{self, StorageOp};
use crate::engine::subvolumes::TARGET_ROOT;
use crate::error::Result;
use crate::executor::{CommandRunner, SystemCommand};
use crate::prompt::Prompter;
use crate::types::choices;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum PostInstallAction {
    #[default]
    #[strum(to_string = "Reboot")]
    Reboot,
    #[strum(to_string = "Chroot into the new system")]
    Chroot,
    #[strum(to_string = "Exit")]
    Exit,
}

/// Ask what to do next. A dismissed menu counts as Exit.
pub fn choose<P: Prompter + ?Sized>(prompter: &mut P) -> Result<PostInstallAction> {
    let options = choices::<PostInstallAction>();
    let answer = prompter.select("Installation complete. What next?", &options, 0)?;
    Ok(answer.parse().unwrap_or(PostInstallAction::Exit))
}

/// Mount operations that rebuild the installed layout under the target
/// root: `@`, the ESP and every nested subvolume.
pub fn remount_ops(config: &InstallConfig) -> Vec<StorageOp> {
    let layout = storage::partition_paths(&config.target_disk);
    storage::plan_mount(&layout, config.compression_level).ops
}

/// Carry out the chosen action.
pub fn perform<R: CommandRunner + ?Sized>(
    action: PostInstallAction,
    config: &InstallConfig,
    runner: &mut R,
) -> Result<()> {
    match action {
        PostInstallAction::Reboot => {
            info!("Rebooting");
            runner.run_checked(&SystemCommand::new("reboot"))?;
        }
        PostInstallAction::Chroot => {
            for op in remount_ops(config) {
                runner.run_checked(&op.to_command())?;
            }
            info!("Entering chroot; exit the shell to return");
            let shell = runner.run_interactive(&SystemCommand::new("arch-chroot").arg(TARGET_ROOT));
            // Unmount even when the shell exits non-zero
            runner.run_checked(&storage::unmount_all().to_command())?;
            shell?;
        }
        PostInstallAction::Exit => info!("Exiting installer"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::complete_draft;
    use crate::executor::CommandOutput;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl CommandRunner for Recorder {
        fn run(&mut self, command: &SystemCommand) -> Result<CommandOutput> {
            self.0.push(command.to_string());
            Ok(CommandOutput::ok(""))
        }
    }

    struct Pick(&'static str);

    impl Prompter for Pick {
        fn text(&mut self, _label: &str) -> Result<String> {
            Ok(String::new())
        }
        fn secret(&mut self, _label: &str) -> Result<String> {
            Ok(String::new())
        }
        fn select(&mut self, _label: &str, _options: &[String], _default: usize) -> Result<String> {
            Ok(self.0.to_string())
        }
        fn confirm(&mut self, _label: &str, default: bool) -> Result<bool> {
            Ok(default)
        }
    }

    #[test]
    fn test_choose_maps_menu_text() {
        assert_eq!(choose(&mut Pick("Reboot")).unwrap(), PostInstallAction::Reboot);
        assert_eq!(
            choose(&mut Pick("Chroot into the new system")).unwrap(),
            PostInstallAction::Chroot
        );
        assert_eq!(choose(&mut Pick("")).unwrap(), PostInstallAction::Exit);
    }

    #[test]
    fn test_chroot_remounts_then_unmounts() {
        let config = complete_draft().finalize().unwrap();
        let mut runner = Recorder::default();
        perform(PostInstallAction::Chroot, &config, &mut runner).unwrap();

        let opts = |subvol: &str| format!("'subvol={subvol},compress=zstd:3,compress-force=zstd:3'");
        let mut expected = vec![
            format!("mount -o {} /dev/sda2 /mnt", opts("@")),
            "mkdir -p /mnt/boot/efi".to_string(),
            "mount /dev/sda1 /mnt/boot/efi".to_string(),
        ];
        for (subvol, dir) in [
            ("@home", "/mnt/home"),
            ("@root", "/mnt/root"),
            ("@srv", "/mnt/srv"),
            ("@cache", "/mnt/var/cache"),
            ("@tmp", "/mnt/var/tmp"),
            ("@log", "/mnt/var/log"),
        ] {
            expected.push(format!("mkdir -p {dir}"));
            expected.push(format!("mount -o {} /dev/sda2 {dir}", opts(subvol)));
        }
        expected.push("arch-chroot /mnt".to_string());
        expected.push("umount -R /mnt".to_string());

        assert_eq!(runner.0, expected);
    }

    #[test]
    fn test_chroot_mounts_every_subvolume() {
        let config = complete_draft().finalize().unwrap();
        let btrfs_mounts = remount_ops(&config)
            .iter()
            .filter(|op| matches!(op, StorageOp::Mount { options: Some(_), .. }))
            .count();
        assert_eq!(btrfs_mounts, crate::engine::subvolumes::SUBVOLUMES.len());
    }

    #[test]
    fn test_exit_runs_nothing() {
        let config = complete_draft().finalize().unwrap();
        let mut runner = Recorder::default();
        perform(PostInstallAction::Exit, &config, &mut runner).unwrap();
        assert!(runner.0.is_empty());
    }
}
