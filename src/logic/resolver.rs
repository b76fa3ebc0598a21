//! Configuration resolver.
//!
//! Merges a persisted configuration file with interactive prompts: a value
//! from the file always wins, and every field still unset afterwards is asked
//! for exactly once. A malformed value, in the file or typed at a prompt,
//! is treated like a missing one: the file's is prompted for, the prompt's
//! stays unset. Turning an unset field into an error is the caller's job
//! (`ConfigDraft::finalize`).
//!
//! # What This Explicitly Refuses To Do
//!
//! - Re-prompt a field the file already supplied
//! - Loop until an answer is given (one prompt per field, per run)
//! - Validate cross-field rules (see `InstallConfig::validate`)

use anyhow::Result;
use std::path::Path;
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::config::{ConfigDraft, ConfigField, PromptKind};
use crate::config_file::{InvalidValue, load_config_file_with, load_package_list};
use crate::prompt::Prompter;
use crate::types::{choices, BootFilesystem, Bootloader, DesktopEnvironment, Initramfs, Kernel};

/// Ask for every field the draft still needs, in prompt order.
///
/// Returns the fields that were routed to the prompter.
pub fn fill_missing<P: Prompter + ?Sized>(
    draft: &mut ConfigDraft,
    prompter: &mut P,
) -> crate::error::Result<Vec<ConfigField>> {
    let mut asked = Vec::new();

    for field in ConfigField::iter() {
        // Gaming depends on the desktop answer, so it is evaluated in order
        if !draft.needs_value(field) {
            continue;
        }
        asked.push(field);

        let label = field.prompt_label();
        match field.prompt_kind() {
            PromptKind::Text => {
                let answer = prompter.text(label)?;
                apply_answer(draft, field, &answer);
            }
            PromptKind::Secret => {
                let answer = prompter.secret(label)?;
                apply_answer(draft, field, &answer);
            }
            PromptKind::Choice => {
                let (options, default) = menu_for(field);
                let answer = prompter.select(label, &options, default)?;
                apply_answer(draft, field, &answer);
            }
            PromptKind::YesNo => {
                let answer = prompter.confirm(label, false)?;
                draft.gaming = Some(answer);
            }
        }

        if draft.is_set(field) {
            debug!("Resolved {} from prompt", field);
        } else {
            warn!("No value given for {}", field);
        }
    }

    Ok(asked)
}

fn apply_answer(draft: &mut ConfigDraft, field: ConfigField, answer: &str) {
    if let Err(err) = draft.set_text(field, answer) {
        warn!("Rejected answer for {}: {}", field, err);
    }
}

fn menu_for(field: ConfigField) -> (Vec<String>, usize) {
    fn with_default<T: IntoEnumIterator + ToString + Default>() -> (Vec<String>, usize) {
        let options = choices::<T>();
        let default = T::default().to_string();
        let index = options.iter().position(|o| *o == default).unwrap_or(0);
        (options, index)
    }

    match field {
        ConfigField::BootFs => with_default::<BootFilesystem>(),
        ConfigField::Desktop => with_default::<DesktopEnvironment>(),
        ConfigField::Kernel => with_default::<Kernel>(),
        ConfigField::Initramfs => with_default::<Initramfs>(),
        ConfigField::Bootloader => with_default::<Bootloader>(),
        _ => (Vec::new(), 0),
    }
}

/// Append packages from the extra-package list, if one is configured.
///
/// `override_path` (from the command line) takes precedence over the
/// `extra_packages_file` key.
pub fn load_extra_packages(draft: &mut ConfigDraft, override_path: Option<&Path>) -> Result<()> {
    let path = match override_path {
        Some(path) => path.to_path_buf(),
        None => match &draft.extra_packages_file {
            Some(path) => path.clone(),
            None => return Ok(()),
        },
    };

    let packages = load_package_list(&path)?;
    info!("Loaded {} extra package(s) from {:?}", packages.len(), path);
    draft.extra_packages.extend(packages);
    Ok(())
}

/// Full resolution: optional file, then prompts, then the extra-package list.
pub fn resolve<P: Prompter + ?Sized>(
    config_path: Option<&Path>,
    packages_path: Option<&Path>,
    prompter: &mut P,
) -> Result<ConfigDraft> {
    let mut draft = match config_path {
        Some(path) => load_config_file_with(path, InvalidValue::Unset)?,
        None => ConfigDraft::default(),
    };

    let asked = fill_missing(&mut draft, prompter)?;
    info!("Configuration resolved ({} field(s) prompted)", asked.len());

    load_extra_packages(&mut draft, packages_path)?;
    Ok(draft)
}
