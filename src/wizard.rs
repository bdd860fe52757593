//! Four-step preferences wizard.
//!
//! Pure state machine: holds the working copy of the preference record and a
//! current step. Navigation clamps at both ends; submit is only available from
//! the final step and leaves the state untouched when the save fails, so the
//! user can retry without re-entering anything.

use rajni_core::{error::RajniError, prefs::UserPreferences, traits::KeyedStore};
use serde_json::Value;

/// Wizard steps in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    FoodAndDining,
    Travel,
    Shopping,
    LocationAndWork,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        WizardStep::FoodAndDining,
        WizardStep::Travel,
        WizardStep::Shopping,
        WizardStep::LocationAndWork,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::FoodAndDining => "Food & Dining",
            Self::Travel => "Travel",
            Self::Shopping => "Shopping & Payments",
            Self::LocationAndWork => "Location & Work",
        }
    }

    /// 1-based position, for "Step 2 of 4" labels.
    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .map(|i| i + 1)
            .unwrap_or(1)
    }

    pub fn is_last(&self) -> bool {
        *self == Self::LocationAndWork
    }
}

/// Wizard state: current step plus the record under edit.
pub struct PreferencesWizard {
    step: WizardStep,
    pub prefs: UserPreferences,
}

impl PreferencesWizard {
    /// Start at the first step, editing the given record (existing values
    /// pre-filled, or defaults for a new user).
    pub fn new(prefs: UserPreferences) -> Self {
        Self {
            step: WizardStep::FoodAndDining,
            prefs,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Advance one step; clamps at the last step.
    pub fn next(&mut self) {
        let idx = self.step.position() - 1;
        if idx + 1 < WizardStep::ALL.len() {
            self.step = WizardStep::ALL[idx + 1];
        }
    }

    /// Go back one step; clamps at the first step.
    pub fn previous(&mut self) {
        let idx = self.step.position() - 1;
        if idx > 0 {
            self.step = WizardStep::ALL[idx - 1];
        }
    }

    /// Save the full record through the store gateway.
    ///
    /// Only available from the final step. On failure the step and the edited
    /// values are untouched.
    pub async fn submit(
        &mut self,
        store: &dyn KeyedStore,
        table: &str,
        user_key: &str,
    ) -> Result<Value, RajniError> {
        if !self.step.is_last() {
            return Err(RajniError::Validation(
                "complete all steps before saving".to_string(),
            ));
        }
        store.upsert(table, user_key, self.prefs.to_record()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FailingStore;

    #[async_trait]
    impl KeyedStore for FailingStore {
        async fn fetch(&self, _table: &str, _key: &str) -> Result<Option<Value>, RajniError> {
            Err(RajniError::Store("down".into()))
        }
        async fn upsert(
            &self,
            _table: &str,
            _key: &str,
            _record: Value,
        ) -> Result<Value, RajniError> {
            Err(RajniError::Store("down".into()))
        }
    }

    struct EchoStore;

    #[async_trait]
    impl KeyedStore for EchoStore {
        async fn fetch(&self, _table: &str, _key: &str) -> Result<Option<Value>, RajniError> {
            Ok(None)
        }
        async fn upsert(
            &self,
            _table: &str,
            _key: &str,
            record: Value,
        ) -> Result<Value, RajniError> {
            Ok(record)
        }
    }

    #[test]
    fn test_navigation_clamps_at_both_ends() {
        let mut wizard = PreferencesWizard::new(UserPreferences::default());
        wizard.previous();
        assert_eq!(wizard.step(), WizardStep::FoodAndDining);

        for _ in 0..10 {
            wizard.next();
        }
        assert_eq!(wizard.step(), WizardStep::LocationAndWork);
        assert!(wizard.step().is_last());
    }

    #[test]
    fn test_positions_are_one_based_and_ordered() {
        let positions: Vec<usize> = WizardStep::ALL.iter().map(|s| s.position()).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_submit_only_from_final_step() {
        let mut wizard = PreferencesWizard::new(UserPreferences::default());
        let err = wizard
            .submit(&EchoStore, "user_preferences", "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, RajniError::Validation(_)));
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_state_for_retry() {
        let mut wizard = PreferencesWizard::new(UserPreferences::default());
        wizard.prefs.home_location = "HSR Layout".to_string();
        for _ in 0..3 {
            wizard.next();
        }

        let err = wizard
            .submit(&FailingStore, "user_preferences", "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, RajniError::Store(_)));
        assert_eq!(wizard.step(), WizardStep::LocationAndWork);
        assert_eq!(wizard.prefs.home_location, "HSR Layout");

        let saved = wizard
            .submit(&EchoStore, "user_preferences", "user-1")
            .await
            .unwrap();
        assert_eq!(saved["home_location"], "HSR Layout");
    }
}
