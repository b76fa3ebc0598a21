//! Installation pipeline.
//!
//! Drives `InstallerContext` through every work stage in order. Each stage
//! asks the engine for its commands and hands them to the `CommandRunner`
//! one at a time; the first failure marks the context `Failed` and stops the
//! run. Nothing is rolled back: partitions, filesystems and mounts created
//! before the failure stay as they are.

use tracing::{debug, info};

use crate::config::InstallConfig;
use crate::engine::chroot_script::{self, ChrootScript};
use crate::engine::fstab;
use crate::engine::storage::{self, PartitionLayout, StoragePlan};
use crate::engine::subvolumes::{self, TARGET_ROOT};
use crate::error::{InstallError, Result};
use crate::executor::{CommandRunner, SystemCommand};
use crate::install_state::{InstallStage, InstallerContext, WORK_STAGE_COUNT};
use crate::logic::packages;
use crate::profiles;
use crate::progress::{ProgressEvent, ProgressSink};

/// Locale categories written to `/etc/locale.conf` besides `LANG`
pub const LOCALE_CATEGORIES: &[&str] = &[
    "LC_ADDRESS",
    "LC_IDENTIFICATION",
    "LC_MEASUREMENT",
    "LC_MONETARY",
    "LC_NAME",
    "LC_NUMERIC",
    "LC_PAPER",
    "LC_TELEPHONE",
    "LC_TIME",
];

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub completed_stages: usize,
    pub layout: PartitionLayout,
    pub root_uuid: String,
}

pub struct Installer<'a, R: CommandRunner, S: ProgressSink> {
    config: &'a InstallConfig,
    runner: &'a mut R,
    progress: &'a mut S,
    context: InstallerContext,
    layout: PartitionLayout,
    root_uuid: Option<String>,
}

impl<'a, R: CommandRunner, S: ProgressSink> Installer<'a, R, S> {
    pub fn new(config: &'a InstallConfig, runner: &'a mut R, progress: &'a mut S) -> Self {
        Self {
            layout: storage::partition_paths(&config.target_disk),
            config,
            runner,
            progress,
            context: InstallerContext::new(),
            root_uuid: None,
        }
    }

    /// Authorize the partitioning stage. Without this `run` refuses to start.
    pub fn confirm_destructive(&mut self) {
        self.context.confirm_destructive_operations();
    }

    pub fn context(&self) -> &InstallerContext {
        &self.context
    }

    pub fn layout(&self) -> &PartitionLayout {
        &self.layout
    }

    /// Execute every stage in order, stopping at the first failure.
    pub fn run(&mut self) -> Result<InstallReport> {
        info!(
            "Installing onto {} (boot {}, root {})",
            self.config.target_disk, self.layout.boot, self.layout.root
        );

        for (index, &stage) in InstallStage::work_stages().iter().enumerate() {
            self.context.transition_to(stage)?;
            self.progress.emit(ProgressEvent::StageStarted {
                stage,
                index: index + 1,
                total: WORK_STAGE_COUNT,
            });

            if let Err(err) = self.execute(stage) {
                self.context.fail()?;
                self.progress.emit(ProgressEvent::Failed {
                    stage,
                    message: err.to_string(),
                });
                return Err(err);
            }

            self.progress.emit(ProgressEvent::StageCompleted {
                stage,
                completed: self.context.completed_stages() + 1,
                total: WORK_STAGE_COUNT,
            });
        }

        self.context.advance()?;
        self.progress.emit(ProgressEvent::Finished);

        let root_uuid = self.root_uuid.clone().unwrap_or_default();
        Ok(InstallReport {
            completed_stages: self.context.completed_stages(),
            layout: self.layout.clone(),
            root_uuid,
        })
    }

    fn execute(&mut self, stage: InstallStage) -> Result<()> {
        debug!("Executing stage: {}", stage);
        match stage {
            InstallStage::Partitioning => {
                self.run_plan(&storage::plan_partition(&self.config.target_disk))
            }
            InstallStage::Formatting => {
                self.run_plan(&storage::plan_format(&self.layout, self.config.boot_fs))
            }
            InstallStage::CreatingSubvolumes => {
                self.run_plan(&storage::plan_subvolumes(&self.layout.root))
            }
            InstallStage::MountingWithCompression => self.run_plan(&storage::plan_mount(
                &self.layout,
                self.config.compression_level,
            )),
            InstallStage::InstallingBaseSystem => {
                let package_list = packages::base_packages(self.config);
                info!("Installing {} package(s) with pacstrap", package_list.len());
                self.run_command(&packages::pacstrap_command(&package_list))
            }
            InstallStage::GeneratingFstab => self.generate_fstab(),
            InstallStage::ConfiguringLocale => self.run_command(&SystemCommand::write_file(
                &subvolumes::target_path("/etc/locale.conf"),
                locale_conf(&self.config.locale),
            )),
            InstallStage::PreparingChrootScript => self.prepare_chroot_script(),
            InstallStage::RunningChroot => self.run_command(
                &SystemCommand::new("arch-chroot").args([TARGET_ROOT, chroot_script::CHROOT_PATH]),
            ),
            InstallStage::CleaningUp => self.run_command(&storage::unmount_all().to_command()),
            InstallStage::NotStarted | InstallStage::Complete | InstallStage::Failed => Ok(()),
        }
    }

    fn run_plan(&mut self, plan: &StoragePlan) -> Result<()> {
        debug!("{}", plan.summary());
        for command in plan.commands() {
            self.run_command(&command)?;
        }
        Ok(())
    }

    fn run_command(&mut self, command: &SystemCommand) -> Result<()> {
        self.progress.emit(ProgressEvent::Command(command.to_string()));
        self.runner.run_checked(command)?;
        Ok(())
    }

    /// UUID of a partition as reported by blkid.
    fn read_uuid(&mut self, device: &str) -> Result<String> {
        let command = SystemCommand::new("blkid").args(["-s", "UUID", "-o", "value", device]);
        self.progress.emit(ProgressEvent::Command(command.to_string()));
        let output = self.runner.run_checked(&command)?;
        let uuid = output.stdout.trim();
        if uuid.is_empty() {
            return Err(InstallError::MissingUuid {
                device: device.to_string(),
            });
        }
        Ok(uuid.to_string())
    }

    fn root_uuid(&mut self) -> Result<String> {
        if let Some(uuid) = &self.root_uuid {
            return Ok(uuid.clone());
        }
        let root = self.layout.root.clone();
        let uuid = self.read_uuid(&root)?;
        self.root_uuid = Some(uuid.clone());
        Ok(uuid)
    }

    fn generate_fstab(&mut self) -> Result<()> {
        let root_uuid = self.root_uuid()?;
        let boot = self.layout.boot.clone();
        let boot_uuid = self.read_uuid(&boot)?;
        info!("Root UUID {}, boot UUID {}", root_uuid, boot_uuid);

        let appendix = fstab::render_appendix(
            &root_uuid,
            self.config.compression_level,
            Some((&boot_uuid, self.config.boot_fs)),
        );
        self.run_command(&SystemCommand::append_file(
            &subvolumes::target_path("/etc/fstab"),
            appendix,
        ))
    }

    fn prepare_chroot_script(&mut self) -> Result<()> {
        let root_uuid = self.root_uuid()?;
        let kernel = profiles::kernel_package(self.config.kernel);
        let script = ChrootScript::build(self.config, kernel, &root_uuid);
        debug!("Chroot script sections: {:?}", script.kinds());

        self.run_command(&SystemCommand::write_file(
            chroot_script::HOST_PATH,
            script.render(),
        ))?;
        self.run_command(&SystemCommand::new("chmod").args(["+x", chroot_script::HOST_PATH]))
    }
}

/// `/etc/locale.conf` contents: `LANG` plus every `LC_*` category.
pub fn locale_conf(locale: &str) -> String {
    std::iter::once("LANG")
        .chain(LOCALE_CATEGORIES.iter().copied())
        .map(|key| format!("{key}={locale}\n"))
        .collect()
}
