//! Configuration file handling for saving and loading installation configs.
//!
//! The format is plain `key=value`, one per line. Lines starting with `#` and
//! blank lines are ignored, keys are case-insensitive, and surrounding quotes
//! are stripped from values. Unknown keys are skipped with a warning.
//!
//! ```text
//! # /root/cachy.conf
//! target_disk=/dev/nvme0n1
//! desktop="KDE Plasma"
//! compression_level=3
//! extra_packages_file=/root/extra.txt
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{ConfigDraft, ConfigField, InstallConfig};
use crate::error::InstallError;

/// Key holding the path of an extra-package list
pub const EXTRA_PACKAGES_FILE_KEY: &str = "extra_packages_file";
/// Key holding inline, whitespace-separated extra packages
pub const EXTRA_PACKAGES_KEY: &str = "extra_packages";

/// What to do with a value that does not parse for its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidValue {
    /// Fail the whole parse
    Reject,
    /// Warn and leave the field unset so it is prompted for
    Unset,
}

/// Parse configuration text into a draft.
///
/// Fields absent from the text stay unset so the resolver can prompt for
/// them. A value outside a field's catalog is an error.
pub fn parse_config(contents: &str) -> crate::error::Result<ConfigDraft> {
    parse_config_with(contents, InvalidValue::Reject)
}

/// Parse configuration text, handling malformed values per `policy`.
pub fn parse_config_with(
    contents: &str,
    policy: InvalidValue,
) -> crate::error::Result<ConfigDraft> {
    let mut draft = ConfigDraft::default();

    for (index, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(InstallError::config(format!(
                "line {}: expected key=value, got '{}'",
                index + 1,
                line
            )));
        };
        let key = key.trim();
        let value = strip_quotes(value.trim());

        if key.eq_ignore_ascii_case(EXTRA_PACKAGES_FILE_KEY) {
            if !value.is_empty() {
                draft.extra_packages_file = Some(PathBuf::from(value));
            }
            continue;
        }
        if key.eq_ignore_ascii_case(EXTRA_PACKAGES_KEY) {
            draft
                .extra_packages
                .extend(value.split_whitespace().map(str::to_string));
            continue;
        }

        match ConfigField::from_key(key) {
            Some(field) => match draft.set_text(field, value) {
                Err(err) if policy == InvalidValue::Unset => warn!(
                    "Line {}: {}; {} will be prompted for",
                    index + 1,
                    err,
                    field
                ),
                result => result?,
            },
            None => warn!("Ignoring unknown configuration key '{}' on line {}", key, index + 1),
        }
    }

    Ok(draft)
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Load a configuration file from disk, rejecting malformed values
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<ConfigDraft> {
    load_config_file_with(path, InvalidValue::Reject)
}

pub fn load_config_file_with<P: AsRef<Path>>(path: P, policy: InvalidValue) -> Result<ConfigDraft> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration from {:?}", path))?;

    let draft = parse_config_with(&content, policy)
        .with_context(|| format!("Invalid configuration in {:?}", path))?;
    debug!("Loaded configuration file {:?}", path);

    Ok(draft)
}

/// Parse an extra-package list: one or more names per line, `#` comments.
///
/// Order is preserved and duplicates are kept.
pub fn parse_package_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(str::to_string))
        .collect()
}

/// Load an extra-package list from disk
pub fn load_package_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read package list from {:?}", path))?;
    Ok(parse_package_list(&content))
}

/// Render a configuration back to `key=value` text. Passwords are omitted
/// so a saved file always prompts for them again.
pub fn render_config(config: &InstallConfig) -> String {
    let summary = config.summary();
    let entries: [(ConfigField, String); 13] = [
        (ConfigField::TargetDisk, summary.target_disk),
        (ConfigField::BootFs, summary.boot_fs),
        (ConfigField::Hostname, summary.hostname),
        (ConfigField::Timezone, summary.timezone),
        (ConfigField::Keymap, summary.keymap),
        (ConfigField::Locale, summary.locale),
        (ConfigField::Username, summary.username),
        (ConfigField::Desktop, summary.desktop),
        (ConfigField::Kernel, summary.kernel),
        (ConfigField::Initramfs, summary.initramfs),
        (ConfigField::Bootloader, summary.bootloader),
        (ConfigField::CompressionLevel, summary.compression_level.to_string()),
        (
            ConfigField::Gaming,
            if summary.gaming { "yes" } else { "no" }.to_string(),
        ),
    ];

    let mut out = String::from("# CachyOS Btrfs installer configuration\n");
    for (field, value) in entries {
        if value.contains(char::is_whitespace) {
            out.push_str(&format!("{field}=\"{value}\"\n"));
        } else {
            out.push_str(&format!("{field}={value}\n"));
        }
    }
    if !summary.extra_packages.is_empty() {
        out.push_str(&format!(
            "{}={}\n",
            EXTRA_PACKAGES_KEY,
            summary.extra_packages.join(" ")
        ));
    }
    out
}

/// Save configuration (minus passwords) to a file
pub fn save_config_file<P: AsRef<Path>>(config: &InstallConfig, path: P) -> Result<()> {
    fs::write(&path, render_config(config))
        .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;
    Ok(())
}
