//! Installation configuration model.
//!
//! `ConfigDraft` is the mutable record filled during resolution (file load,
//! then prompts). `InstallConfig` is the validated, immutable value the
//! pipeline consumes; it can only be produced by `ConfigDraft::finalize`.

use crate::error::{InstallError, Result};
use crate::types::{
    parse_choice, BootFilesystem, Bootloader, DesktopEnvironment, Initramfs, Kernel,
};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use strum::{Display, EnumIter, IntoEnumIterator};

/// Highest zstd level accepted by btrfs
pub const MAX_COMPRESSION_LEVEL: u8 = 22;

/// Every resolvable configuration field, in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ConfigField {
    TargetDisk,
    BootFs,
    Hostname,
    Timezone,
    Keymap,
    Locale,
    Username,
    UserPassword,
    RootPassword,
    Desktop,
    Kernel,
    Initramfs,
    Bootloader,
    CompressionLevel,
    Gaming,
}

/// How a field is collected interactively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Text,
    Secret,
    Choice,
    YesNo,
}

impl ConfigField {
    /// Look up a configuration file key. Keys are case-insensitive and the
    /// upper-case names used by older installer scripts are accepted.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        let field = match key.as_str() {
            "target_disk" | "disk" => Self::TargetDisk,
            "boot_fs" | "boot_fs_type" => Self::BootFs,
            "hostname" => Self::Hostname,
            "timezone" => Self::Timezone,
            "keymap" => Self::Keymap,
            "locale" => Self::Locale,
            "username" | "user_name" => Self::Username,
            "user_password" => Self::UserPassword,
            "root_password" => Self::RootPassword,
            "desktop" | "desktop_env" => Self::Desktop,
            "kernel" | "kernel_type" => Self::Kernel,
            "initramfs" => Self::Initramfs,
            "bootloader" => Self::Bootloader,
            "compression_level" | "compression" => Self::CompressionLevel,
            "gaming" => Self::Gaming,
            _ => return None,
        };
        Some(field)
    }

    pub const fn prompt_kind(self) -> PromptKind {
        match self {
            Self::UserPassword | Self::RootPassword => PromptKind::Secret,
            Self::BootFs | Self::Desktop | Self::Kernel | Self::Initramfs | Self::Bootloader => {
                PromptKind::Choice
            }
            Self::Gaming => PromptKind::YesNo,
            _ => PromptKind::Text,
        }
    }

    pub const fn prompt_label(self) -> &'static str {
        match self {
            Self::TargetDisk => "Target disk (e.g. /dev/nvme0n1)",
            Self::BootFs => "Boot partition filesystem",
            Self::Hostname => "Hostname",
            Self::Timezone => "Timezone (e.g. Europe/London)",
            Self::Keymap => "Console keymap (e.g. uk)",
            Self::Locale => "Locale (e.g. en_GB.UTF-8)",
            Self::Username => "Username",
            Self::UserPassword => "User password",
            Self::RootPassword => "Root password",
            Self::Desktop => "Desktop environment",
            Self::Kernel => "Kernel",
            Self::Initramfs => "Initramfs generator",
            Self::Bootloader => "Bootloader",
            Self::CompressionLevel => "Btrfs zstd compression level (0-22)",
            Self::Gaming => "Install cachyos-gaming-meta?",
        }
    }

    /// Secrets are never written back to disk or logged
    pub const fn is_secret(self) -> bool {
        matches!(self, Self::UserPassword | Self::RootPassword)
    }
}

/// Configuration under construction. `None` means "not yet resolved".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDraft {
    pub target_disk: Option<String>,
    pub boot_fs: Option<BootFilesystem>,
    pub hostname: Option<String>,
    pub timezone: Option<String>,
    pub keymap: Option<String>,
    pub locale: Option<String>,
    pub username: Option<String>,
    pub user_password: Option<String>,
    pub root_password: Option<String>,
    pub desktop: Option<DesktopEnvironment>,
    pub kernel: Option<Kernel>,
    pub initramfs: Option<Initramfs>,
    pub bootloader: Option<Bootloader>,
    pub compression_level: Option<u8>,
    pub gaming: Option<bool>,
    pub extra_packages: Vec<String>,
    pub extra_packages_file: Option<PathBuf>,
}

impl ConfigDraft {
    pub fn is_set(&self, field: ConfigField) -> bool {
        match field {
            ConfigField::TargetDisk => self.target_disk.is_some(),
            ConfigField::BootFs => self.boot_fs.is_some(),
            ConfigField::Hostname => self.hostname.is_some(),
            ConfigField::Timezone => self.timezone.is_some(),
            ConfigField::Keymap => self.keymap.is_some(),
            ConfigField::Locale => self.locale.is_some(),
            ConfigField::Username => self.username.is_some(),
            ConfigField::UserPassword => self.user_password.is_some(),
            ConfigField::RootPassword => self.root_password.is_some(),
            ConfigField::Desktop => self.desktop.is_some(),
            ConfigField::Kernel => self.kernel.is_some(),
            ConfigField::Initramfs => self.initramfs.is_some(),
            ConfigField::Bootloader => self.bootloader.is_some(),
            ConfigField::CompressionLevel => self.compression_level.is_some(),
            ConfigField::Gaming => self.gaming.is_some(),
        }
    }

    /// Whether the field still needs a value before the pipeline may start.
    ///
    /// The gaming bundle is only asked about for desktop installs and
    /// defaults to "no" otherwise.
    pub fn needs_value(&self, field: ConfigField) -> bool {
        if self.is_set(field) {
            return false;
        }
        match field {
            ConfigField::Gaming => matches!(self.desktop, Some(d) if !d.is_headless()),
            _ => true,
        }
    }

    /// Required fields that are still empty.
    pub fn missing_fields(&self) -> Vec<ConfigField> {
        ConfigField::iter()
            .filter(|f| *f != ConfigField::Gaming && !self.is_set(*f))
            .collect()
    }

    /// Store a textual value into a field.
    ///
    /// Blank input leaves the field unset. Catalog fields reject values
    /// outside their catalog; the compression level must be an integer in
    /// `0..=22`.
    pub fn set_text(&mut self, field: ConfigField, raw: &str) -> Result<()> {
        let value = raw.trim();
        if value.is_empty() {
            return Ok(());
        }
        let text = || Some(value.to_string());
        match field {
            ConfigField::TargetDisk => self.target_disk = text(),
            ConfigField::BootFs => self.boot_fs = Some(parse_choice(field, value)?),
            ConfigField::Hostname => self.hostname = text(),
            ConfigField::Timezone => self.timezone = text(),
            ConfigField::Keymap => self.keymap = text(),
            ConfigField::Locale => self.locale = text(),
            ConfigField::Username => self.username = text(),
            // Passwords keep inner whitespace exactly as typed
            ConfigField::UserPassword => self.user_password = Some(raw.to_string()),
            ConfigField::RootPassword => self.root_password = Some(raw.to_string()),
            ConfigField::Desktop => self.desktop = Some(parse_choice(field, value)?),
            ConfigField::Kernel => self.kernel = Some(parse_choice(field, value)?),
            ConfigField::Initramfs => self.initramfs = Some(parse_choice(field, value)?),
            ConfigField::Bootloader => self.bootloader = Some(parse_choice(field, value)?),
            ConfigField::CompressionLevel => {
                self.compression_level = Some(parse_compression_level(value)?)
            }
            ConfigField::Gaming => self.gaming = Some(parse_yes_no(field, value)?),
        }
        Ok(())
    }

    /// Freeze the draft into a validated `InstallConfig`.
    pub fn finalize(self) -> Result<InstallConfig> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(InstallError::MissingFields(missing));
        }

        let missing_field = |field: ConfigField| InstallError::MissingFields(vec![field]);
        let desktop = self.desktop.ok_or_else(|| missing_field(ConfigField::Desktop))?;
        let config = InstallConfig {
            target_disk: self
                .target_disk
                .ok_or_else(|| missing_field(ConfigField::TargetDisk))?,
            boot_fs: self.boot_fs.ok_or_else(|| missing_field(ConfigField::BootFs))?,
            hostname: self.hostname.ok_or_else(|| missing_field(ConfigField::Hostname))?,
            timezone: self.timezone.ok_or_else(|| missing_field(ConfigField::Timezone))?,
            keymap: self.keymap.ok_or_else(|| missing_field(ConfigField::Keymap))?,
            locale: self.locale.ok_or_else(|| missing_field(ConfigField::Locale))?,
            username: self.username.ok_or_else(|| missing_field(ConfigField::Username))?,
            user_password: self
                .user_password
                .ok_or_else(|| missing_field(ConfigField::UserPassword))?,
            root_password: self
                .root_password
                .ok_or_else(|| missing_field(ConfigField::RootPassword))?,
            desktop,
            kernel: self.kernel.ok_or_else(|| missing_field(ConfigField::Kernel))?,
            initramfs: self
                .initramfs
                .ok_or_else(|| missing_field(ConfigField::Initramfs))?,
            bootloader: self
                .bootloader
                .ok_or_else(|| missing_field(ConfigField::Bootloader))?,
            compression_level: self
                .compression_level
                .ok_or_else(|| missing_field(ConfigField::CompressionLevel))?,
            gaming: !desktop.is_headless() && self.gaming.unwrap_or(false),
            extra_packages: self.extra_packages,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_compression_level(value: &str) -> Result<u8> {
    let level: u8 = value.parse().map_err(|_| {
        InstallError::validation(format!(
            "compression_level must be an integer between 0 and {MAX_COMPRESSION_LEVEL}, got '{value}'"
        ))
    })?;
    if level > MAX_COMPRESSION_LEVEL {
        return Err(InstallError::validation(format!(
            "compression_level must be between 0 and {MAX_COMPRESSION_LEVEL}, got {level}"
        )));
    }
    Ok(level)
}

fn parse_yes_no(field: ConfigField, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "on" => Ok(true),
        "no" | "n" | "false" | "0" | "off" => Ok(false),
        _ => Err(InstallError::UnknownValue {
            field,
            value: value.to_string(),
        }),
    }
}

/// The fully resolved installation parameters. Immutable for a run.
#[derive(Clone, PartialEq, Eq)]
pub struct InstallConfig {
    pub target_disk: String,
    pub boot_fs: BootFilesystem,
    pub hostname: String,
    pub timezone: String,
    pub keymap: String,
    pub locale: String,
    pub username: String,
    pub user_password: String,
    pub root_password: String,
    pub desktop: DesktopEnvironment,
    pub kernel: Kernel,
    pub initramfs: Initramfs,
    pub bootloader: Bootloader,
    pub compression_level: u8,
    pub gaming: bool,
    pub extra_packages: Vec<String>,
}

impl fmt::Debug for InstallConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallConfig")
            .field("target_disk", &self.target_disk)
            .field("boot_fs", &self.boot_fs)
            .field("hostname", &self.hostname)
            .field("timezone", &self.timezone)
            .field("keymap", &self.keymap)
            .field("locale", &self.locale)
            .field("username", &self.username)
            .field("user_password", &"<redacted>")
            .field("root_password", &"<redacted>")
            .field("desktop", &self.desktop)
            .field("kernel", &self.kernel)
            .field("initramfs", &self.initramfs)
            .field("bootloader", &self.bootloader)
            .field("compression_level", &self.compression_level)
            .field("gaming", &self.gaming)
            .field("extra_packages", &self.extra_packages)
            .finish()
    }
}

impl InstallConfig {
    /// Check every field against the rules the generated commands rely on.
    pub fn validate(&self) -> Result<()> {
        validate_disk(&self.target_disk)?;
        validate_hostname(&self.hostname)?;
        validate_username(&self.username)?;
        validate_password("User password", &self.user_password)?;
        validate_password("Root password", &self.root_password)?;
        validate_token("Timezone", &self.timezone, |c| matches!(c, '/' | '_' | '-' | '+'))?;
        validate_token("Keymap", &self.keymap, |c| matches!(c, '-' | '_' | '.'))?;
        validate_token("Locale", &self.locale, |c| matches!(c, '_' | '.' | '-' | '@'))?;
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(InstallError::validation(format!(
                "Compression level must be between 0 and {MAX_COMPRESSION_LEVEL}"
            )));
        }
        if let Some(bad) = self
            .extra_packages
            .iter()
            .find(|p| p.starts_with('-') || p.chars().any(char::is_whitespace))
        {
            return Err(InstallError::validation(format!(
                "Invalid extra package name '{bad}'"
            )));
        }
        Ok(())
    }

    /// Secret-free view used for `validate --json` and logging.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            target_disk: self.target_disk.clone(),
            boot_fs: self.boot_fs.to_string(),
            hostname: self.hostname.clone(),
            timezone: self.timezone.clone(),
            keymap: self.keymap.clone(),
            locale: self.locale.clone(),
            username: self.username.clone(),
            desktop: self.desktop.to_string(),
            kernel: self.kernel.to_string(),
            initramfs: self.initramfs.to_string(),
            bootloader: self.bootloader.to_string(),
            compression_level: self.compression_level,
            gaming: self.gaming,
            extra_packages: self.extra_packages.clone(),
        }
    }
}

/// Serializable configuration without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    pub target_disk: String,
    pub boot_fs: String,
    pub hostname: String,
    pub timezone: String,
    pub keymap: String,
    pub locale: String,
    pub username: String,
    pub desktop: String,
    pub kernel: String,
    pub initramfs: String,
    pub bootloader: String,
    pub compression_level: u8,
    pub gaming: bool,
    pub extra_packages: Vec<String>,
}

fn validate_disk(disk: &str) -> Result<()> {
    let Some(name) = disk.strip_prefix("/dev/") else {
        return Err(InstallError::validation(format!(
            "Target disk must be a /dev path, got '{disk}'"
        )));
    };
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-'))
    {
        return Err(InstallError::validation(format!(
            "Target disk '{disk}' contains invalid characters"
        )));
    }
    Ok(())
}

fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.is_empty() || hostname.len() > 63 {
        return Err(InstallError::validation(
            "Hostname must be 1-63 characters long",
        ));
    }
    if hostname.starts_with('-') || hostname.ends_with('-') {
        return Err(InstallError::validation(
            "Hostname cannot start or end with a hyphen",
        ));
    }
    if !hostname.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(InstallError::validation(
            "Hostname can only contain letters, numbers, and hyphens",
        ));
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<()> {
    let mut chars = username.chars();
    let Some(first) = chars.next() else {
        return Err(InstallError::validation("Username must be specified"));
    };
    if username.len() > 32 {
        return Err(InstallError::validation(
            "Username must be at most 32 characters long",
        ));
    }
    if !(first.is_ascii_lowercase() || first == '_') {
        return Err(InstallError::validation(
            "Username must start with a lowercase letter or underscore",
        ));
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-') {
        return Err(InstallError::validation(
            "Username can only contain lowercase letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

fn validate_password(label: &str, password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(InstallError::validation(format!("{label} must be specified")));
    }
    if password.contains(['\n', '\r', '\0']) {
        return Err(InstallError::validation(format!(
            "{label} cannot contain line breaks"
        )));
    }
    Ok(())
}

fn validate_token(label: &str, value: &str, extra: impl Fn(char) -> bool) -> Result<()> {
    if value.is_empty() {
        return Err(InstallError::validation(format!("{label} must be specified")));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || extra(c)) {
        return Err(InstallError::validation(format!(
            "{label} '{value}' contains invalid characters"
        )));
    }
    if value.contains("..") {
        return Err(InstallError::validation(format!(
            "{label} '{value}' cannot contain '..'"
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn complete_draft() -> ConfigDraft {
        ConfigDraft {
            target_disk: Some("/dev/sda".into()),
            boot_fs: Some(BootFilesystem::Fat32),
            hostname: Some("cachyos".into()),
            timezone: Some("Europe/London".into()),
            keymap: Some("uk".into()),
            locale: Some("en_GB.UTF-8".into()),
            username: Some("user".into()),
            user_password: Some("hunter2".into()),
            root_password: Some("toor".into()),
            desktop: Some(DesktopEnvironment::KdePlasma),
            kernel: Some(Kernel::Bore),
            initramfs: Some(Initramfs::Mkinitcpio),
            bootloader: Some(Bootloader::Grub),
            compression_level: Some(3),
            gaming: None,
            extra_packages: Vec::new(),
            extra_packages_file: None,
        }
    }

    // =========================================================================
    // ConfigField
    // =========================================================================

    #[test]
    fn test_field_keys_accept_aliases() {
        assert_eq!(ConfigField::from_key("TARGET_DISK"), Some(ConfigField::TargetDisk));
        assert_eq!(ConfigField::from_key("user_name"), Some(ConfigField::Username));
        assert_eq!(ConfigField::from_key("DESKTOP_ENV"), Some(ConfigField::Desktop));
        assert_eq!(ConfigField::from_key("kernel_type"), Some(ConfigField::Kernel));
        assert_eq!(ConfigField::from_key("boot_fs_type"), Some(ConfigField::BootFs));
        assert_eq!(ConfigField::from_key("favourite_colour"), None);
    }

    #[test]
    fn test_field_display_matches_canonical_key() {
        for field in ConfigField::iter() {
            assert_eq!(ConfigField::from_key(&field.to_string()), Some(field));
        }
    }

    #[test]
    fn test_prompt_kinds() {
        assert_eq!(ConfigField::RootPassword.prompt_kind(), PromptKind::Secret);
        assert_eq!(ConfigField::Kernel.prompt_kind(), PromptKind::Choice);
        assert_eq!(ConfigField::Gaming.prompt_kind(), PromptKind::YesNo);
        assert_eq!(ConfigField::CompressionLevel.prompt_kind(), PromptKind::Text);
    }

    // =========================================================================
    // ConfigDraft
    // =========================================================================

    #[test]
    fn test_blank_value_leaves_field_unset() {
        let mut draft = ConfigDraft::default();
        draft.set_text(ConfigField::Hostname, "   ").unwrap();
        assert!(!draft.is_set(ConfigField::Hostname));
    }

    #[test]
    fn test_compression_zero_is_a_real_value() {
        let mut draft = ConfigDraft::default();
        draft.set_text(ConfigField::CompressionLevel, "0").unwrap();
        assert_eq!(draft.compression_level, Some(0));
        assert!(!draft.needs_value(ConfigField::CompressionLevel));
    }

    #[test]
    fn test_compression_out_of_range_rejected() {
        let mut draft = ConfigDraft::default();
        assert!(draft.set_text(ConfigField::CompressionLevel, "23").is_err());
        assert!(draft.set_text(ConfigField::CompressionLevel, "fast").is_err());
        assert!(draft.compression_level.is_none());
    }

    #[test]
    fn test_unknown_catalog_value_is_error() {
        let mut draft = ConfigDraft::default();
        let err = draft.set_text(ConfigField::Bootloader, "lilo").unwrap_err();
        assert!(matches!(
            err,
            InstallError::UnknownValue { field: ConfigField::Bootloader, .. }
        ));
    }

    #[test]
    fn test_gaming_only_needed_for_desktop_installs() {
        let mut draft = complete_draft();
        assert!(draft.needs_value(ConfigField::Gaming));
        draft.desktop = Some(DesktopEnvironment::None);
        assert!(!draft.needs_value(ConfigField::Gaming));
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let mut draft = complete_draft();
        draft.hostname = None;
        draft.kernel = None;
        assert_eq!(
            draft.missing_fields(),
            vec![ConfigField::Hostname, ConfigField::Kernel]
        );
        let err = draft.finalize().unwrap_err();
        assert!(matches!(err, InstallError::MissingFields(ref f) if f.len() == 2));
    }

    #[test]
    fn test_finalize_complete_draft() {
        let config = complete_draft().finalize().unwrap();
        assert_eq!(config.target_disk, "/dev/sda");
        assert!(!config.gaming);
    }

    #[test]
    fn test_gaming_ignored_for_headless() {
        let mut draft = complete_draft();
        draft.desktop = Some(DesktopEnvironment::None);
        draft.gaming = Some(true);
        assert!(!draft.finalize().unwrap().gaming);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn test_rejects_shell_metacharacters_in_hostname() {
        let mut draft = complete_draft();
        draft.hostname = Some("host; rm -rf /".into());
        assert!(matches!(
            draft.finalize().unwrap_err(),
            InstallError::Validation(_)
        ));
    }

    #[test]
    fn test_rejects_bad_usernames() {
        for name in ["Root", "1user", "us er", "user$"] {
            let mut draft = complete_draft();
            draft.username = Some(name.into());
            assert!(draft.finalize().is_err(), "{name} should be rejected");
        }
    }

    #[test]
    fn test_password_may_contain_quotes_but_not_newlines() {
        let mut draft = complete_draft();
        draft.user_password = Some("it's \"fine\"".into());
        assert!(draft.clone().finalize().is_ok());
        draft.user_password = Some("two\nlines".into());
        assert!(draft.finalize().is_err());
    }

    #[test]
    fn test_rejects_non_dev_disk() {
        let mut draft = complete_draft();
        draft.target_disk = Some("sda".into());
        assert!(draft.finalize().is_err());
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let config = complete_draft().finalize().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("toor"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_summary_serializes_without_secrets() {
        let config = complete_draft().finalize().unwrap();
        let json = serde_json::to_string(&config.summary()).unwrap();
        assert!(json.contains("\"desktop\":\"KDE Plasma\""));
        assert!(!json.contains("hunter2"));
    }
}
