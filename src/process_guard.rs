//! Process lifecycle management for child processes
//!
//! Disk commands (`wipefs`, `parted`, `mkfs.btrfs`, `pacstrap`) must not keep
//! running against the target disk after the installer itself has gone away.
//!
//! - Every child is spawned in its own process group
//! - Child PIDs are tracked in a global registry while they run
//! - On SIGINT/SIGTERM/SIGHUP, or when the `ProcessGuard` drops, each group
//!   gets SIGTERM, then SIGKILL after a grace period
//! - Children also receive SIGTERM from the kernel if the installer dies
//!   (`PR_SET_PDEATHSIG`)

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Registry tracking all spawned child processes
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
    /// Set once termination has started, so a second signal is a no-op
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    /// Lock the global registry. A poisoned lock still holds a usable set
    /// of PIDs, so it is recovered rather than propagated.
    fn lock_global(registry: &Mutex<ChildRegistry>) -> MutexGuard<'_, ChildRegistry> {
        registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a PID with the global registry
    pub fn track(pid: u32) {
        let registry = Self::global();
        Self::lock_global(&registry).register(pid);
    }

    /// Remove a PID from the global registry
    pub fn release(pid: u32) {
        let registry = Self::global();
        Self::lock_global(&registry).unregister(pid);
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        debug!("Registered child process PID {}", pid);
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        debug!("Unregistered child process PID {}", pid);
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Terminate all tracked child process groups.
    /// Sends SIGTERM first, waits up to `grace_period`, then SIGKILL.
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            debug!("Cleanup already initiated, skipping");
            return;
        }
        self.cleanup_initiated = true;

        if self.pids.is_empty() {
            return;
        }

        info!("Terminating {} child process(es)...", self.pids.len());

        let pids: Vec<u32> = self.pids.iter().copied().collect();
        for &pid in &pids {
            if let Err(e) = send_signal_to_group(pid, Signal::SIGTERM) {
                warn!("Failed to send SIGTERM to process group {}: {}", pid, e);
                if let Err(e) = send_signal(pid, Signal::SIGTERM) {
                    warn!("Failed to send SIGTERM to PID {}: {}", pid, e);
                }
            }
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            if pids.iter().all(|&pid| !is_process_alive(pid)) {
                info!("All child processes terminated gracefully");
                self.pids.clear();
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in &pids {
            if is_process_alive(pid) {
                warn!("Process group {} did not terminate, sending SIGKILL", pid);
                if send_signal_to_group(pid, Signal::SIGKILL).is_err() {
                    let _ = send_signal(pid, Signal::SIGKILL);
                }
            }
        }

        self.pids.clear();
        info!("Child process cleanup complete");
    }
}

fn send_signal(pid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), signal)
}

/// Negative PID signals the whole group, so tools forked by the child
/// (e.g. the pacman run inside pacstrap) receive it too
fn send_signal_to_group(pgid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), signal)
}

/// Check if a process is still alive (not dead or zombie)
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }

    // Field 3 of /proc/<pid>/stat is the state; Z and X are not running
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        if let Some(state) = stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
        {
            return !matches!(state, "Z" | "X");
        }
    }

    true
}

/// RAII guard that terminates all tracked children on drop.
/// Held for the duration of an installation run.
pub struct ProcessGuard {
    registry: Arc<Mutex<ChildRegistry>>,
}

impl ProcessGuard {
    pub fn new() -> Self {
        Self {
            registry: ChildRegistry::global(),
        }
    }
}

impl Default for ProcessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        debug!("ProcessGuard dropped, initiating cleanup");
        ChildRegistry::lock_global(&self.registry).terminate_all(Duration::from_secs(5));
    }
}

/// Install handlers for SIGINT (Ctrl+C), SIGTERM and SIGHUP that kill all
/// tracked children and exit with `128 + signal`. Call once at startup.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "UNKNOWN",
            };
            warn!("Received {}, stopping child processes", name);

            let registry = ChildRegistry::global();
            ChildRegistry::lock_global(&registry).terminate_all(Duration::from_secs(3));

            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension trait for `std::process::Command` to set up process groups
pub trait CommandProcessGroup {
    /// Run the command as leader of a new process group that dies with us
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: the closure only calls async-signal-safe setpgid/prctl
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;

                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }

                Ok(())
            });
        }
        self
    }
}
