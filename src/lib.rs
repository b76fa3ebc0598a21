//! cachyinstall library
//!
//! Core of the CachyOS Btrfs installer: configuration resolution, command
//! planning for the disk layout, the staged installation pipeline, and the
//! privileged executor every side effect goes through.

pub mod cli;
pub mod config;
pub mod config_file;
pub mod engine;
pub mod error;
pub mod executor;
pub mod install_state;
pub mod installer;
pub mod logic;
pub mod post_install;
pub mod preflight;
pub mod process_guard;
pub mod profiles;
pub mod progress;
pub mod prompt;
pub mod theme;
pub mod types;
pub mod ui;

// Re-export main types for convenience
pub use config::{ConfigDraft, ConfigField, InstallConfig};
pub use error::{InstallError, Result};
pub use executor::{CommandOutput, CommandRunner, PrivilegedExecutor, SystemCommand};
pub use install_state::{InstallStage, InstallTransitionError, InstallerContext};
pub use installer::{InstallReport, Installer};
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use progress::{LogProgress, ProgressEvent, ProgressSink};
pub use prompt::{ConsolePrompter, Prompter};
pub use types::{BootFilesystem, Bootloader, DesktopEnvironment, Initramfs, Kernel};

// Disk layout planning
pub use engine::storage::{PartitionLayout, StorageOp, StoragePlan, partition_paths};
