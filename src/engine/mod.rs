//! Engine modules: the "brain" that translates the resolved configuration into
//! command sequences and generated files.
//!
//! Everything here is pure. The installer executes what the engine plans.
//!
//! - `subvolumes` - the shared Btrfs subvolume table
//! - `storage` - partition, format, subvolume and mount plans
//! - `fstab` - fstab appendix for the target
//! - `chroot_script` - second-stage setup script

pub mod chroot_script;
pub mod fstab;
pub mod storage;
pub mod subvolumes;
