//! cachyinstall - main entry point
//!
//! Thin shell over the library: logging, argument parsing, privilege
//! setup, and the choice between the plain and full-screen front-ends.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use cachyinstall::cli::{Cli, Commands};
use cachyinstall::config::{ConfigField, InstallConfig};
use cachyinstall::logic::resolver;
use cachyinstall::{
    InstallError, Installer, LogProgress, PrivilegedExecutor, ProcessGuard, Prompter,
    ConsolePrompter, config_file, post_install, preflight, process_guard, ui,
};

/// Stand-in used by `validate` for passwords a saved file leaves out
const PROMPTED_LATER: &str = "prompted-at-install";

/// Initialize tracing; `RUST_LOG` overrides the default level
fn init_tracing(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match cli.log_destination() {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Main application entry point
fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(&cli) {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
    info!("cachyinstall starting up");

    // Children are killed on SIGINT/SIGTERM/SIGHUP; Drop still covers normal exit
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    debug!("Signal handlers initialized");

    let result = match cli.command {
        Commands::Install {
            config,
            packages,
            save_config,
            yes,
            sudo,
            tui,
            no_post_menu,
        } => run_install(InstallOptions {
            config,
            packages,
            save_config,
            yes,
            sudo,
            tui,
            post_menu: !no_post_menu,
        }),
        Commands::Validate {
            config,
            packages,
            json,
        } => run_validate(&config, packages.as_deref(), json),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("✗ {:#}", e);
        if let Some(err) = e.downcast_ref::<InstallError>()
            && err.is_precondition()
        {
            eprintln!("  No disk was modified");
        }
        std::process::exit(1);
    }
}

struct InstallOptions {
    config: Option<PathBuf>,
    packages: Option<PathBuf>,
    save_config: Option<PathBuf>,
    yes: bool,
    sudo: bool,
    tui: bool,
    post_menu: bool,
}

fn run_install(opts: InstallOptions) -> Result<()> {
    let mut prompter = ConsolePrompter::new();

    let draft = resolver::resolve(opts.config.as_deref(), opts.packages.as_deref(), &mut prompter)?;
    let config = draft.finalize()?;
    info!("Resolved configuration: {:?}", config);

    if let Some(path) = &opts.save_config {
        config_file::save_config_file(&config, path)?;
        info!("Configuration saved to {:?}", path);
    }

    let mut executor = build_executor(opts.sudo, &mut prompter)?;
    let privileged = executor.uses_sudo() || preflight::is_running_as_root();
    let binaries = preflight::required_binaries(config.boot_fs, executor.uses_sudo());
    preflight::verify(
        privileged,
        Path::new(preflight::EFI_FIRMWARE_PATH),
        &binaries,
    )?;

    if !opts.yes {
        let question = format!(
            "All data on {} will be erased. Continue?",
            config.target_disk
        );
        if !prompter.confirm(&question, false)? {
            return Err(InstallError::Cancelled(format!(
                "{} left untouched",
                config.target_disk
            ))
            .into());
        }
    }

    let _guard = ProcessGuard::new();
    let report = if opts.tui {
        ui::run_monitored(|events| install(&config, &mut executor, events))?
    } else {
        install(&config, &mut executor, &mut LogProgress)?
    };
    info!(
        "Installation finished: {} stages, root UUID {}",
        report.completed_stages,
        report.root_uuid
    );

    if opts.post_menu {
        let action = post_install::choose(&mut prompter)?;
        post_install::perform(action, &config, &mut executor)?;
    }
    Ok(())
}

fn install<S: cachyinstall::ProgressSink>(
    config: &InstallConfig,
    executor: &mut PrivilegedExecutor,
    progress: &mut S,
) -> cachyinstall::Result<cachyinstall::InstallReport> {
    let mut installer = Installer::new(config, executor, progress);
    // Confirmation was collected (or waived with --yes) before we got here
    installer.confirm_destructive();
    installer.run()
}

fn build_executor(sudo: bool, prompter: &mut ConsolePrompter) -> Result<PrivilegedExecutor> {
    if !sudo {
        return Ok(PrivilegedExecutor::as_root());
    }
    let password = Zeroizing::new(prompter.secret("sudo password")?);
    let executor = PrivilegedExecutor::with_sudo(password)?;
    Ok(executor)
}

fn run_validate(path: &Path, packages: Option<&Path>, json: bool) -> Result<()> {
    info!("Validating configuration file: {:?}", path);
    let mut draft = config_file::load_config_file(path)?;
    resolver::load_extra_packages(&mut draft, packages)?;

    let (secrets, required): (Vec<ConfigField>, Vec<ConfigField>) = draft
        .missing_fields()
        .into_iter()
        .partition(|field| field.is_secret());
    if !required.is_empty() {
        return Err(InstallError::MissingFields(required).into());
    }
    for field in &secrets {
        draft.set_text(*field, PROMPTED_LATER)?;
    }

    let config = draft.finalize()?;
    if json {
        let summary = serde_json::to_string_pretty(&config.summary())
            .context("Failed to serialize configuration")?;
        println!("{}", summary);
    } else {
        println!("✓ Configuration file is valid: {}", path.display());
        for field in &secrets {
            println!("  {} will be prompted at install time", field);
        }
    }
    info!("Configuration validation successful");
    Ok(())
}
