//! Install State Machine
//!
//! Authoritative source of truth for pipeline progress. It enforces valid
//! state transitions and makes it impossible to skip stages programmatically.
//!
//! # Design Principles
//!
//! - **Single Source of Truth**: The `InstallerContext` owns the current stage
//! - **Validated Transitions**: Only forward transitions to the next stage are allowed
//! - **No Global State**: State is owned by `InstallerContext`, not global/static
//! - **Fail Fast**: Invalid transitions return errors immediately
//!
//! # Stage Flow
//!
//! ```text
//! NotStarted
//!     ↓
//! Partitioning            (destructive, needs confirmation)
//!     ↓
//! Formatting
//!     ↓
//! CreatingSubvolumes
//!     ↓
//! MountingWithCompression
//!     ↓
//! InstallingBaseSystem
//!     ↓
//! GeneratingFstab
//!     ↓
//! ConfiguringLocale
//!     ↓
//! PreparingChrootScript
//!     ↓
//! RunningChroot
//!     ↓
//! CleaningUp
//!     ↓
//! Complete
//!
//! (Any in-progress stage can transition to Failed)
//! ```

use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Number of stages that do work (everything between NotStarted and Complete)
pub const WORK_STAGE_COUNT: usize = 10;

/// Pipeline stages in sequential order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstallStage {
    /// Installation has not started yet
    NotStarted = 0,

    /// Wipe the disk and write the partition table.
    /// This is a DESTRUCTIVE stage - requires explicit confirmation
    Partitioning = 1,

    /// Create the boot and Btrfs filesystems
    Formatting = 2,

    /// Create the subvolume layout on the top-level subvolume
    CreatingSubvolumes = 3,

    /// Mount every subvolume with zstd compression under /mnt
    MountingWithCompression = 4,

    /// pacstrap the base system
    InstallingBaseSystem = 5,

    /// Append UUID entries to the target's fstab
    GeneratingFstab = 6,

    /// Write /etc/locale.conf
    ConfiguringLocale = 7,

    /// Write the second-stage script onto the target
    PreparingChrootScript = 8,

    /// Execute the second-stage script inside arch-chroot
    RunningChroot = 9,

    /// Unmount the target
    CleaningUp = 10,

    /// Installation completed successfully (terminal state)
    Complete = 11,

    /// Installation failed (terminal state)
    Failed = 255,
}

impl InstallStage {
    /// Returns the numeric order of this stage (0-11, 255 for Failed)
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Returns true if this is a terminal state (Complete or Failed)
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Returns true if this stage involves destructive disk operations
    #[inline]
    pub const fn is_destructive(self) -> bool {
        matches!(self, Self::Partitioning)
    }

    /// Returns the next stage in the sequence, or None if at a terminal state
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::Partitioning),
            Self::Partitioning => Some(Self::Formatting),
            Self::Formatting => Some(Self::CreatingSubvolumes),
            Self::CreatingSubvolumes => Some(Self::MountingWithCompression),
            Self::MountingWithCompression => Some(Self::InstallingBaseSystem),
            Self::InstallingBaseSystem => Some(Self::GeneratingFstab),
            Self::GeneratingFstab => Some(Self::ConfiguringLocale),
            Self::ConfiguringLocale => Some(Self::PreparingChrootScript),
            Self::PreparingChrootScript => Some(Self::RunningChroot),
            Self::RunningChroot => Some(Self::CleaningUp),
            Self::CleaningUp => Some(Self::Complete),
            Self::Complete | Self::Failed => None,
        }
    }

    /// Returns a human-readable description of this stage
    pub const fn description(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::Partitioning => "Partitioning disk",
            Self::Formatting => "Formatting partitions",
            Self::CreatingSubvolumes => "Creating Btrfs subvolumes",
            Self::MountingWithCompression => "Mounting with compression",
            Self::InstallingBaseSystem => "Installing base system",
            Self::GeneratingFstab => "Generating fstab",
            Self::ConfiguringLocale => "Configuring locale",
            Self::PreparingChrootScript => "Preparing chroot script",
            Self::RunningChroot => "Running chroot configuration",
            Self::CleaningUp => "Cleaning up",
            Self::Complete => "Installation complete",
            Self::Failed => "Installation failed",
        }
    }

    /// Returns all stages in order (excluding Failed)
    pub const fn all_stages() -> &'static [Self] {
        &[
            Self::NotStarted,
            Self::Partitioning,
            Self::Formatting,
            Self::CreatingSubvolumes,
            Self::MountingWithCompression,
            Self::InstallingBaseSystem,
            Self::GeneratingFstab,
            Self::ConfiguringLocale,
            Self::PreparingChrootScript,
            Self::RunningChroot,
            Self::CleaningUp,
            Self::Complete,
        ]
    }

    /// Stages that execute commands, in order
    pub fn work_stages() -> &'static [Self] {
        &Self::all_stages()[1..=WORK_STAGE_COUNT]
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallTransitionError {
    /// Attempted to skip one or more stages
    #[error("Cannot skip from {from} to {to} (must transition through intermediate stages)")]
    SkippedStage {
        from: InstallStage,
        to: InstallStage,
    },

    /// Attempted to go backwards (not allowed)
    #[error("Cannot go backwards from {from} to {to} (installation is forward-only)")]
    BackwardTransition {
        from: InstallStage,
        to: InstallStage,
    },

    /// Attempted to transition from a terminal state
    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: InstallStage },

    /// Attempted a transition that requires confirmation without providing it
    #[error("Stage {stage} requires explicit confirmation (destructive operation)")]
    MissingConfirmation { stage: InstallStage },

    /// Attempted to transition to the same state
    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: InstallStage },
}

/// Context for tracking installation state.
///
/// # Example
///
/// ```
/// use cachyinstall::install_state::{InstallerContext, InstallStage};
///
/// let mut ctx = InstallerContext::new();
/// ctx.confirm_destructive_operations();
/// ctx.advance().unwrap();
/// assert_eq!(ctx.current_stage(), InstallStage::Partitioning);
///
/// // Cannot skip stages
/// assert!(ctx.transition_to(InstallStage::RunningChroot).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct InstallerContext {
    current: InstallStage,

    /// Stage at which failure occurred (if any)
    failed_at: Option<InstallStage>,

    /// Entered stages with unix timestamps
    stage_history: Vec<(InstallStage, u64)>,

    /// Whether destructive operations have been confirmed
    destructive_confirmed: bool,
}

impl Default for InstallerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallerContext {
    pub fn new() -> Self {
        Self {
            current: InstallStage::NotStarted,
            failed_at: None,
            stage_history: Vec::with_capacity(InstallStage::all_stages().len()),
            destructive_confirmed: false,
        }
    }

    #[inline]
    pub fn current_stage(&self) -> InstallStage {
        self.current
    }

    /// Returns the stage at which failure occurred, if any
    #[inline]
    pub fn failed_at(&self) -> Option<InstallStage> {
        self.failed_at
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current == InstallStage::Complete
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.current == InstallStage::Failed
    }

    /// Returns true if the installation is in progress (not terminal)
    #[inline]
    pub fn is_in_progress(&self) -> bool {
        !self.current.is_terminal() && self.current != InstallStage::NotStarted
    }

    /// Number of work stages that finished.
    ///
    /// Entering a stage means the one before it completed; a failed stage
    /// does not count.
    pub fn completed_stages(&self) -> usize {
        let reached = match self.current {
            InstallStage::Complete => return WORK_STAGE_COUNT,
            InstallStage::Failed => self.failed_at.unwrap_or(InstallStage::NotStarted),
            stage => stage,
        };
        usize::from(reached.order()).saturating_sub(1)
    }

    /// Returns the current progress percentage (0-100)
    pub fn progress_percent(&self) -> u8 {
        // Bounded by WORK_STAGE_COUNT, so the result is at most 100
        (self.completed_stages() * 100 / WORK_STAGE_COUNT) as u8
    }

    pub fn stage_history(&self) -> &[(InstallStage, u64)] {
        &self.stage_history
    }

    /// Confirm that destructive operations are authorized.
    ///
    /// This must be called before transitioning to `Partitioning`.
    /// The confirmation is a one-way flag that cannot be revoked.
    pub fn confirm_destructive_operations(&mut self) {
        self.destructive_confirmed = true;
    }

    #[inline]
    pub fn is_destructive_confirmed(&self) -> bool {
        self.destructive_confirmed
    }

    /// Advance to the next stage in sequence.
    ///
    /// # Errors
    ///
    /// - `FromTerminalState` if already at Complete or Failed
    /// - `MissingConfirmation` if entering a destructive stage without confirmation
    pub fn advance(&mut self) -> Result<InstallStage, InstallTransitionError> {
        let Some(next_stage) = self.current.next() else {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        };
        self.transition_to(next_stage)
    }

    /// Transition to a specific stage (must be the next stage in sequence).
    ///
    /// # Errors
    ///
    /// - `AlreadyAtStage` if target is the current stage
    /// - `BackwardTransition` if target is before current
    /// - `SkippedStage` if target is not the immediate next stage
    /// - `FromTerminalState` if current is a terminal state
    /// - `MissingConfirmation` if entering a destructive stage without confirmation
    pub fn transition_to(
        &mut self,
        target: InstallStage,
    ) -> Result<InstallStage, InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }

        if target == self.current {
            return Err(InstallTransitionError::AlreadyAtStage { stage: target });
        }

        // Failed is only reachable through fail()
        if target == InstallStage::Failed {
            return Err(InstallTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        if target.order() < self.current.order() {
            return Err(InstallTransitionError::BackwardTransition {
                from: self.current,
                to: target,
            });
        }

        if self.current.next() != Some(target) {
            return Err(InstallTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        if target.is_destructive() && !self.destructive_confirmed {
            return Err(InstallTransitionError::MissingConfirmation { stage: target });
        }

        debug!("Stage transition: {} -> {}", self.current, target);
        self.record_stage_transition(target);
        self.current = target;

        Ok(target)
    }

    /// Mark the installation as failed at the current stage.
    ///
    /// # Errors
    ///
    /// - `FromTerminalState` if already at Complete or Failed
    pub fn fail(&mut self) -> Result<(), InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }

        warn!("Installation failed during: {}", self.current);
        self.failed_at = Some(self.current);
        self.record_stage_transition(InstallStage::Failed);
        self.current = InstallStage::Failed;

        Ok(())
    }

    fn record_stage_transition(&mut self, stage: InstallStage) {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        self.stage_history.push((stage, timestamp));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmed() -> InstallerContext {
        let mut ctx = InstallerContext::new();
        ctx.confirm_destructive_operations();
        ctx
    }

    // =========================================================================
    // InstallStage Tests
    // =========================================================================

    #[test]
    fn test_stage_order_is_sequential() {
        for (i, stage) in InstallStage::all_stages().iter().enumerate() {
            assert_eq!(
                stage.order() as usize,
                i,
                "Stage {:?} should have order {}",
                stage,
                i
            );
        }
    }

    #[test]
    fn test_stage_next_forms_chain() {
        let mut current = InstallStage::NotStarted;
        let mut count = 0;

        while let Some(next) = current.next() {
            current = next;
            count += 1;
            assert!(count < 20, "Infinite loop detected in stage chain");
        }

        assert_eq!(current, InstallStage::Complete);
        assert_eq!(count, WORK_STAGE_COUNT + 1);
    }

    #[test]
    fn test_work_stages() {
        let work = InstallStage::work_stages();
        assert_eq!(work.len(), WORK_STAGE_COUNT);
        assert_eq!(work.first(), Some(&InstallStage::Partitioning));
        assert_eq!(work.last(), Some(&InstallStage::CleaningUp));
    }

    #[test]
    fn test_destructive_stages() {
        for stage in InstallStage::all_stages() {
            assert_eq!(
                stage.is_destructive(),
                *stage == InstallStage::Partitioning,
                "{:?} destructive flag",
                stage
            );
        }
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(InstallStage::NotStarted.to_string(), "Not started");
        assert_eq!(InstallStage::GeneratingFstab.to_string(), "Generating fstab");
        assert_eq!(InstallStage::Complete.to_string(), "Installation complete");
    }

    // =========================================================================
    // InstallerContext Tests
    // =========================================================================

    #[test]
    fn test_context_starts_at_not_started() {
        let ctx = InstallerContext::new();
        assert_eq!(ctx.current_stage(), InstallStage::NotStarted);
        assert!(!ctx.is_in_progress());
        assert!(!ctx.is_complete());
        assert!(!ctx.is_failed());
        assert_eq!(ctx.progress_percent(), 0);
    }

    #[test]
    fn test_advance_through_all_stages() {
        let mut ctx = confirmed();

        let mut count = 0;
        while ctx.advance().is_ok() {
            count += 1;
            assert!(count < 20, "Infinite loop detected");
        }

        assert!(ctx.is_complete());
        assert_eq!(count, WORK_STAGE_COUNT + 1);
        assert_eq!(ctx.completed_stages(), WORK_STAGE_COUNT);
        assert_eq!(ctx.progress_percent(), 100);
    }

    #[test]
    fn test_cannot_advance_from_terminal_states() {
        let mut ctx = confirmed();
        while !ctx.is_complete() {
            ctx.advance().expect("Should advance");
        }
        assert!(matches!(
            ctx.advance().unwrap_err(),
            InstallTransitionError::FromTerminalState { .. }
        ));

        let mut ctx = confirmed();
        ctx.advance().expect("Partitioning");
        ctx.fail().expect("Should fail");
        assert!(matches!(
            ctx.advance().unwrap_err(),
            InstallTransitionError::FromTerminalState { .. }
        ));
    }

    #[test]
    fn test_cannot_skip_stages() {
        let mut ctx = confirmed();

        let err = ctx.transition_to(InstallStage::Formatting).unwrap_err();
        assert!(matches!(err, InstallTransitionError::SkippedStage { .. }));

        ctx.advance().expect("Should advance");
        let err = ctx
            .transition_to(InstallStage::InstallingBaseSystem)
            .unwrap_err();
        assert!(matches!(err, InstallTransitionError::SkippedStage { .. }));
    }

    #[test]
    fn test_cannot_go_backwards() {
        let mut ctx = confirmed();
        ctx.advance().expect("Partitioning");
        ctx.advance().expect("Formatting");
        ctx.advance().expect("CreatingSubvolumes");

        let err = ctx.transition_to(InstallStage::Partitioning).unwrap_err();
        assert!(matches!(
            err,
            InstallTransitionError::BackwardTransition { .. }
        ));
    }

    #[test]
    fn test_cannot_transition_to_same_stage() {
        let mut ctx = confirmed();
        ctx.advance().expect("Partitioning");

        let err = ctx.transition_to(InstallStage::Partitioning).unwrap_err();
        assert!(matches!(err, InstallTransitionError::AlreadyAtStage { .. }));
    }

    #[test]
    fn test_destructive_stage_requires_confirmation() {
        let mut ctx = InstallerContext::new();

        let err = ctx.advance().unwrap_err();
        assert!(matches!(
            err,
            InstallTransitionError::MissingConfirmation { .. }
        ));
        assert_eq!(ctx.current_stage(), InstallStage::NotStarted);
        assert!(!ctx.is_destructive_confirmed());

        ctx.confirm_destructive_operations();
        assert!(ctx.is_destructive_confirmed());
        ctx.advance().expect("Should advance to Partitioning");
        assert_eq!(ctx.current_stage(), InstallStage::Partitioning);
    }

    #[test]
    fn test_fail_records_failed_at_stage() {
        let mut ctx = confirmed();
        ctx.advance().expect("Partitioning");
        ctx.advance().expect("Formatting");
        ctx.advance().expect("CreatingSubvolumes");

        ctx.fail().expect("Should fail");

        assert!(ctx.is_failed());
        assert_eq!(ctx.failed_at(), Some(InstallStage::CreatingSubvolumes));
        assert_eq!(ctx.completed_stages(), 2);
        assert_eq!(ctx.progress_percent(), 20);
    }

    #[test]
    fn test_failure_in_first_stage_completes_nothing() {
        let mut ctx = confirmed();
        ctx.advance().expect("Partitioning");
        ctx.fail().expect("Should fail");
        assert_eq!(ctx.completed_stages(), 0);
    }

    #[test]
    fn test_stage_history_is_recorded() {
        let mut ctx = confirmed();
        assert!(ctx.stage_history().is_empty());

        ctx.advance().expect("Partitioning");
        ctx.advance().expect("Formatting");
        let stages: Vec<_> = ctx.stage_history().iter().map(|(s, _)| *s).collect();
        assert_eq!(stages, vec![InstallStage::Partitioning, InstallStage::Formatting]);
    }

    // =========================================================================
    // Error Display Tests
    // =========================================================================

    #[test]
    fn test_error_display() {
        let err = InstallTransitionError::SkippedStage {
            from: InstallStage::NotStarted,
            to: InstallStage::Formatting,
        };
        let msg = err.to_string();
        assert!(msg.contains("Cannot skip"));
        assert!(msg.contains("Not started"));
        assert!(msg.contains("Formatting partitions"));
    }
}
