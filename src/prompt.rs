//! Interactive prompt channel.
//!
//! The resolver talks to a `Prompter` so the console implementation can be
//! swapped for a scripted one in tests. Every method returns the user's raw
//! answer; an empty string means "no answer".

use crate::error::{InstallError, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};

/// Source of answers for unresolved configuration fields.
pub trait Prompter {
    /// Free-form text input
    fn text(&mut self, label: &str) -> Result<String>;

    /// Hidden input for credentials
    fn secret(&mut self, label: &str) -> Result<String>;

    /// Single choice from a menu; returns the chosen option's text, or an
    /// empty string when the menu was dismissed.
    fn select(&mut self, label: &str, options: &[String], default: usize) -> Result<String>;

    /// Yes/no question
    fn confirm(&mut self, label: &str, default: bool) -> Result<bool>;
}

/// Console prompts on the controlling terminal.
pub struct ConsolePrompter {
    theme: ColorfulTheme,
}

impl ConsolePrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for ConsolePrompter {
    fn default() -> Self {
        Self::new()
    }
}

fn prompt_error(err: dialoguer::Error) -> InstallError {
    InstallError::prompt(err.to_string())
}

impl Prompter for ConsolePrompter {
    fn text(&mut self, label: &str) -> Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(label)
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_error)
    }

    fn secret(&mut self, label: &str) -> Result<String> {
        Password::with_theme(&self.theme)
            .with_prompt(label)
            .with_confirmation("Repeat to confirm", "Entries do not match")
            .allow_empty_password(true)
            .interact()
            .map_err(prompt_error)
    }

    fn select(&mut self, label: &str, options: &[String], default: usize) -> Result<String> {
        let choice = Select::with_theme(&self.theme)
            .with_prompt(label)
            .items(options)
            .default(default)
            .interact_opt()
            .map_err(prompt_error)?;
        Ok(choice
            .and_then(|index| options.get(index).cloned())
            .unwrap_or_default())
    }

    fn confirm(&mut self, label: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(label)
            .default(default)
            .interact()
            .map_err(prompt_error)
    }
}
