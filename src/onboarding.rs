//! First-run flow: welcome → benefits → install → setup → complete.
//!
//! Steps and actions are explicit enums and every transition is checked
//! against [`transition`]. Finishing the flow marks onboarding completed,
//! which unlocks the collections.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::models::{Section, SetupData};
use crate::storage::{Storage, keys};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Welcome,
    Benefits,
    Install,
    Setup,
    Complete,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Welcome,
        Step::Benefits,
        Step::Install,
        Step::Setup,
        Step::Complete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Step::Welcome => "welcome",
            Step::Benefits => "benefits",
            Step::Install => "install",
            Step::Setup => "setup",
            Step::Complete => "complete",
        }
    }

    /// 1-based position in the flow
    pub fn number(self) -> usize {
        Step::ALL.iter().position(|s| *s == self).unwrap_or(0) + 1
    }

    pub fn percent(self) -> usize {
        self.number() * 100 / Step::ALL.len()
    }

    /// Actions accepted on this step
    pub fn allowed(self) -> &'static [&'static str] {
        match self {
            Step::Welcome => &["next"],
            Step::Benefits => &["next", "back"],
            Step::Install => &["install", "skip", "back"],
            Step::Setup => &["next", "back"],
            Step::Complete => &["finish", "open <section>", "back"],
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Next,
    Back,
    Install,
    SkipInstall,
    Finish,
    /// Finish and go straight to creating an entry in `Section`
    OpenSection(Section),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Next => f.write_str("next"),
            Action::Back => f.write_str("back"),
            Action::Install => f.write_str("install"),
            Action::SkipInstall => f.write_str("skip"),
            Action::Finish => f.write_str("finish"),
            Action::OpenSection(section) => write!(f, "open {}", section),
        }
    }
}

/// Where control goes once onboarding is finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Home,
    /// Open a section with a create action pending
    CreateIn(Section),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved(Step),
    Finished(Exit),
}

#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("Cannot {action} from the {step} step (allowed: {})", .step.allowed().join(", "))]
    InvalidTransition { step: Step, action: Action },
    #[error("Onboarding is already completed")]
    AlreadyCompleted,
    #[error("Setup choices can only be changed on the setup step (currently on {0})")]
    NotOnSetupStep(Step),
    #[error("Failed to save onboarding progress")]
    PersistFailed,
}

/// The transition table
pub fn transition(step: Step, action: Action) -> Option<Transition> {
    use Action as A;
    use Step as S;

    let next = match (step, action) {
        (S::Welcome, A::Next) => S::Benefits,
        (S::Benefits, A::Next) => S::Install,
        (S::Benefits, A::Back) => S::Welcome,
        (S::Install, A::Install | A::SkipInstall) => S::Setup,
        (S::Install, A::Back) => S::Benefits,
        (S::Setup, A::Next) => S::Complete,
        (S::Setup, A::Back) => S::Install,
        (S::Complete, A::Back) => S::Setup,
        (S::Complete, A::Finish) => return Some(Transition::Finished(Exit::Home)),
        (S::Complete, A::OpenSection(section)) => {
            return Some(Transition::Finished(Exit::CreateIn(section)));
        }
        _ => return None,
    };
    Some(Transition::Moved(next))
}

pub fn is_completed(storage: &Storage) -> bool {
    storage.flag(keys::ONBOARDING_COMPLETED)
}

/// Forget completion so the flow runs again from the start
pub fn reset(storage: &Storage) -> bool {
    let cleared = storage.remove(keys::ONBOARDING_COMPLETED);
    storage.remove(keys::ONBOARDING_STEP) && cleared
}

/// In-progress onboarding state, persisted between invocations
pub struct Onboarding<'s> {
    storage: &'s Storage,
    step: Step,
    setup: SetupData,
}

impl<'s> Onboarding<'s> {
    pub fn load(storage: &'s Storage) -> Self {
        Self {
            storage,
            step: storage.get(keys::ONBOARDING_STEP).unwrap_or(Step::Welcome),
            setup: storage.get(keys::SETUP_DATA).unwrap_or_default(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn setup(&self) -> &SetupData {
        &self.setup
    }

    pub fn is_completed(&self) -> bool {
        is_completed(self.storage)
    }

    pub fn apply(&mut self, action: Action) -> Result<Transition, OnboardingError> {
        if self.is_completed() {
            return Err(OnboardingError::AlreadyCompleted);
        }
        let outcome = transition(self.step, action).ok_or(OnboardingError::InvalidTransition {
            step: self.step,
            action,
        })?;
        match outcome {
            Transition::Moved(next) => {
                if !self.storage.set(keys::ONBOARDING_STEP, &next) {
                    return Err(OnboardingError::PersistFailed);
                }
                tracing::debug!(from = %self.step, to = %next, "onboarding step");
                self.step = next;
            }
            Transition::Finished(exit) => {
                self.complete()?;
                tracing::info!(?exit, "onboarding completed");
            }
        }
        Ok(outcome)
    }

    /// Record setup choices. Only allowed while on the setup step.
    pub fn configure(&mut self, setup: SetupData) -> Result<(), OnboardingError> {
        if self.step != Step::Setup {
            return Err(OnboardingError::NotOnSetupStep(self.step));
        }
        if !self.storage.set(keys::SETUP_DATA, &setup) {
            return Err(OnboardingError::PersistFailed);
        }
        self.setup = setup;
        Ok(())
    }

    fn complete(&mut self) -> Result<(), OnboardingError> {
        if !self.storage.set(keys::ONBOARDING_COMPLETED, &true) {
            return Err(OnboardingError::PersistFailed);
        }
        // Secondary markers; a failure here is logged by storage and does
        // not undo completion
        self.storage.set(keys::SETUP_DATA, &self.setup);
        for section in Section::ALL.iter().copied() {
            self.storage.set(&keys::visited(section), &true);
        }
        self.storage.remove(keys::ONBOARDING_STEP);
        Ok(())
    }
}
