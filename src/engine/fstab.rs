//! fstab appendix for the installed system.

use crate::engine::subvolumes::{BOOT_MOUNTPOINT, SUBVOLUMES};
use crate::types::BootFilesystem;

/// Comment line that opens the Btrfs block
pub const HEADER: &str = "# Btrfs subvolumes";

/// One line per subvolume, in layout order.
pub fn render(root_uuid: &str, compression_level: u8) -> String {
    let mut text = String::from(HEADER);
    text.push('\n');
    for subvol in SUBVOLUMES {
        text.push_str(&format!(
            "UUID={} {} btrfs rw,noatime,compress=zstd:{},subvol={} 0 0\n",
            root_uuid, subvol.mountpoint, compression_level, subvol.name
        ));
    }
    text
}

/// Entry for the boot partition, checked after the root filesystem.
pub fn render_boot(boot_uuid: &str, fs: BootFilesystem) -> String {
    format!(
        "UUID={} {} {} {} 0 2\n",
        boot_uuid,
        BOOT_MOUNTPOINT,
        fs.fstab_type(),
        fs.fstab_options()
    )
}

/// Full block appended to the target's `/etc/fstab`.
pub fn render_appendix(
    root_uuid: &str,
    compression_level: u8,
    boot: Option<(&str, BootFilesystem)>,
) -> String {
    let mut text = render(root_uuid, compression_level);
    if let Some((uuid, fs)) = boot {
        text.push_str(&render_boot(uuid, fs));
    }
    text
}
