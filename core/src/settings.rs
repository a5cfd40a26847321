//! Session-wide toggles targeted by command candidates.

use std::sync::Mutex;

use crate::segments::CandidateCommand;

#[derive(Debug, Default, Clone, Copy)]
struct SettingsState {
    incognito_mode: bool,
    presentation_mode: bool,
}

/// Runtime toggles a command candidate flips when selected.
///
/// Shared behind an `Arc` between sessions; unlike ordinary candidates,
/// selecting a command candidate mutates these and commits nothing.
#[derive(Debug, Default)]
pub struct Settings {
    state: Mutex<SettingsState>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incognito_mode(&self) -> bool {
        self.state.lock().map(|s| s.incognito_mode).unwrap_or(false)
    }

    pub fn set_incognito_mode(&self, enabled: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.incognito_mode = enabled;
        }
    }

    pub fn presentation_mode(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.presentation_mode)
            .unwrap_or(false)
    }

    pub fn set_presentation_mode(&self, enabled: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.presentation_mode = enabled;
        }
    }

    pub fn apply(&self, command: CandidateCommand) {
        match command {
            CandidateCommand::EnableIncognitoMode => self.set_incognito_mode(true),
            CandidateCommand::DisableIncognitoMode => self.set_incognito_mode(false),
            CandidateCommand::EnablePresentationMode => self.set_presentation_mode(true),
            CandidateCommand::DisablePresentationMode => self.set_presentation_mode(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_commands() {
        let settings = Settings::new();
        assert!(!settings.incognito_mode());
        settings.apply(CandidateCommand::EnableIncognitoMode);
        assert!(settings.incognito_mode());
        settings.apply(CandidateCommand::EnablePresentationMode);
        assert!(settings.presentation_mode());
        settings.apply(CandidateCommand::DisableIncognitoMode);
        assert!(!settings.incognito_mode());
        assert!(settings.presentation_mode());
    }
}
