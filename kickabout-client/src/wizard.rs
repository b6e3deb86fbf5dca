use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use kickabout_core::{Activity, Gender, GeoPoint};

use crate::{ActivitySelection, AvatarSource, SetupSubmission};

/// The three steps of profile setup, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    PersonalInfo,
    Activities,
    Preferences,
}

/// Where the wizard is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardStatus {
    Editing,
    Submitting,
    Submitted,
    Failed(String),
}

/// The outcome of trying to move forward
#[derive(Debug)]
pub enum Advance {
    /// The current step was valid, and the wizard moved to the next one
    Moved(WizardStep),
    /// The last step was valid, and the combined submission should be stored
    ReadyToSubmit(SetupSubmission),
    /// A submission is already in flight, nothing happened
    Busy,
}

#[derive(Debug, Clone, Validate)]
pub struct PersonalInfoForm {
    #[validate(length(min = 2, max = 50, message = "Name must be 2 to 50 characters"))]
    pub name: String,
    #[validate(required(message = "Select your gender"))]
    pub gender: Option<Gender>,
    #[validate(length(max = 150, message = "Bio can be at most 150 characters"))]
    pub bio: String,
    #[validate(length(min = 2, message = "Enter your city"))]
    pub city: String,
    #[validate(length(min = 1, message = "Choose a profile photo"))]
    pub avatar_path: String,
    #[validate(range(min = 5, max = 200, message = "Radius must be between 5 and 200 km"))]
    pub distance_radius_km: u32,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Default, Validate)]
pub struct ActivitiesForm {
    #[validate(length(min = 1, message = "Pick at least one activity"), nested)]
    pub selections: Vec<ActivitySelectionForm>,
}

#[derive(Debug, Clone, Validate, serde::Serialize)]
pub struct ActivitySelectionForm {
    pub activity: Activity,
    #[validate(range(min = 1, max = 100, message = "Player count must be between 1 and 100"))]
    pub player_count: u32,
}

#[derive(Debug, Clone, Default, Validate)]
#[validate(schema(function = at_least_one_gender))]
pub struct PreferencesForm {
    pub prefers_male: bool,
    pub prefers_female: bool,
    pub prefers_nonbinary: bool,
}

/// The profile setup wizard.
///
/// Each step is validated on its own when moving forward, and moving back
/// never is. Input lives only in memory, so dropping the wizard loses it.
pub struct SetupWizard {
    step: WizardStep,
    status: WizardStatus,

    pub personal: PersonalInfoForm,
    pub activities: ActivitiesForm,
    pub preferences: PreferencesForm,
}

impl SetupWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::PersonalInfo,
            status: WizardStatus::Editing,
            personal: Default::default(),
            activities: Default::default(),
            preferences: Default::default(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn status(&self) -> &WizardStatus {
        &self.status
    }

    /// Validates the current step and moves forward. On the last step this
    /// produces the submission and marks the wizard as submitting.
    pub fn advance(&mut self) -> Result<Advance, ValidationErrors> {
        if matches!(self.status, WizardStatus::Submitting | WizardStatus::Submitted) {
            return Ok(Advance::Busy);
        }

        self.validate_step(self.step)?;

        match self.step.next() {
            Some(next) => {
                self.step = next;
                self.status = WizardStatus::Editing;
                Ok(Advance::Moved(next))
            }
            None => {
                self.status = WizardStatus::Submitting;
                Ok(Advance::ReadyToSubmit(self.submission()))
            }
        }
    }

    /// Moves back one step. Never validates, input is kept.
    pub fn back(&mut self) -> bool {
        match self.step.previous() {
            Some(previous) => {
                self.step = previous;
                true
            }
            None => false,
        }
    }

    /// Marks the in-flight submission as stored
    pub fn complete(&mut self) {
        self.status = WizardStatus::Submitted;
    }

    /// Marks the in-flight submission as failed, keeping the wizard on the
    /// last step so the user can retry
    pub fn fail(&mut self, message: &str) {
        self.status = WizardStatus::Failed(message.to_string());
    }

    fn validate_step(&self, step: WizardStep) -> Result<(), ValidationErrors> {
        match step {
            WizardStep::PersonalInfo => self.personal.validate(),
            WizardStep::Activities => self.activities.validate(),
            WizardStep::Preferences => self.preferences.validate(),
        }
    }

    fn submission(&self) -> SetupSubmission {
        let avatar = if self.personal.avatar_path.starts_with("http://")
            || self.personal.avatar_path.starts_with("https://")
        {
            AvatarSource::Url(self.personal.avatar_path.clone())
        } else {
            AvatarSource::File(self.personal.avatar_path.clone())
        };

        SetupSubmission {
            name: self.personal.name.trim().to_string(),
            gender: self.personal.gender.expect("gender is validated"),
            bio: self.personal.bio.trim().to_string(),
            city: self.personal.city.trim().to_string(),
            avatar,
            location: self.personal.location,
            distance_radius_km: self.personal.distance_radius_km,
            activities: self
                .activities
                .selections
                .iter()
                .map(|form| ActivitySelection {
                    activity_id: form.activity.id,
                    player_count: form.player_count,
                })
                .collect(),
            prefers_male: self.preferences.prefers_male,
            prefers_female: self.preferences.prefers_female,
            prefers_nonbinary: self.preferences.prefers_nonbinary,
        }
    }
}

impl Default for SetupWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for PersonalInfoForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            gender: None,
            bio: String::new(),
            city: String::new(),
            avatar_path: String::new(),
            distance_radius_km: 25,
            location: None,
        }
    }
}

impl WizardStep {
    pub const COUNT: usize = 3;

    pub fn number(&self) -> usize {
        match self {
            Self::PersonalInfo => 1,
            Self::Activities => 2,
            Self::Preferences => 3,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::PersonalInfo => "About you",
            Self::Activities => "Your activities",
            Self::Preferences => "Who you play with",
        }
    }

    fn next(&self) -> Option<Self> {
        match self {
            Self::PersonalInfo => Some(Self::Activities),
            Self::Activities => Some(Self::Preferences),
            Self::Preferences => None,
        }
    }

    fn previous(&self) -> Option<Self> {
        match self {
            Self::PersonalInfo => None,
            Self::Activities => Some(Self::PersonalInfo),
            Self::Preferences => Some(Self::Activities),
        }
    }
}

impl ActivitiesForm {
    pub fn is_selected(&self, activity: &Activity) -> bool {
        self.selections
            .iter()
            .any(|form| form.activity.id == activity.id)
    }

    /// Adds or removes an activity. New selections start with a sensible
    /// group size.
    pub fn toggle(&mut self, activity: &Activity) {
        if self.is_selected(activity) {
            self.selections
                .retain(|form| form.activity.id != activity.id);
        } else {
            self.selections.push(ActivitySelectionForm {
                activity: activity.clone(),
                player_count: 2,
            });
        }
    }

    pub fn adjust_player_count(&mut self, activity: &Activity, delta: i32) {
        if let Some(form) = self
            .selections
            .iter_mut()
            .find(|form| form.activity.id == activity.id)
        {
            form.player_count = form.player_count.saturating_add_signed(delta).clamp(1, 100);
        }
    }
}

fn at_least_one_gender(form: &PreferencesForm) -> Result<(), ValidationError> {
    if form.prefers_male || form.prefers_female || form.prefers_nonbinary {
        Ok(())
    } else {
        let mut error = ValidationError::new("gender_preference");
        error.message = Some("Pick at least one preference".into());
        Err(error)
    }
}

/// Flattens validation errors into the messages a screen can show
pub fn error_messages(errors: &ValidationErrors) -> Vec<String> {
    fn collect(errors: &ValidationErrors, into: &mut Vec<String>) {
        for kind in errors.errors().values() {
            match kind {
                ValidationErrorsKind::Field(list) => {
                    for error in list {
                        let message = error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| error.code.to_string());
                        into.push(message);
                    }
                }
                ValidationErrorsKind::Struct(nested) => collect(nested, into),
                ValidationErrorsKind::List(map) => {
                    for nested in map.values() {
                        collect(nested, into);
                    }
                }
            }
        }
    }

    let mut messages = Vec::new();
    collect(errors, &mut messages);
    messages
}

#[cfg(test)]
mod test {
    use super::*;
    use kickabout_core::ActivityId;

    fn football() -> Activity {
        Activity {
            id: ActivityId::new(),
            name: "Football".to_string(),
        }
    }

    fn filled_wizard() -> SetupWizard {
        let mut wizard = SetupWizard::new();

        wizard.personal.name = "Sam Porter".to_string();
        wizard.personal.gender = Some(Gender::Other);
        wizard.personal.city = "Berlin".to_string();
        wizard.personal.avatar_path = "https://cdn.example.com/sam.jpg".to_string();
        wizard.activities.toggle(&football());
        wizard.preferences.prefers_female = true;

        wizard
    }

    #[test]
    fn test_first_step_gates_on_invalid_input() {
        let mut wizard = SetupWizard::new();

        let errors = wizard.advance().unwrap_err();
        assert_eq!(wizard.step(), WizardStep::PersonalInfo, "step should not move");

        let messages = error_messages(&errors);
        assert!(
            messages.iter().any(|m| m.contains("Name must be")),
            "missing name should be reported, got {:?}",
            messages
        );
    }

    #[test]
    fn test_back_never_validates() {
        let mut wizard = filled_wizard();

        assert!(matches!(
            wizard.advance().unwrap(),
            Advance::Moved(WizardStep::Activities)
        ));

        // Clear a required field, then go back and forth again
        wizard.personal.name.clear();
        assert!(wizard.back());
        assert_eq!(wizard.step(), WizardStep::PersonalInfo);

        assert!(wizard.advance().is_err(), "forward is gated again");
        assert!(!wizard.back(), "cannot go back from the first step");
    }

    #[test]
    fn test_activity_step_requirements() {
        let mut wizard = filled_wizard();
        wizard.advance().unwrap();

        // Deselect everything
        let selected = wizard.activities.selections[0].activity.clone();
        wizard.activities.toggle(&selected);
        assert!(wizard.advance().is_err(), "empty selection should gate");

        // An out of range player count gates too
        wizard.activities.toggle(&football());
        wizard.activities.selections[0].player_count = 0;
        assert!(wizard.advance().is_err());

        wizard.activities.selections[0].player_count = 10;
        assert!(matches!(
            wizard.advance().unwrap(),
            Advance::Moved(WizardStep::Preferences)
        ));
    }

    #[test]
    fn test_preferences_require_at_least_one() {
        let mut wizard = filled_wizard();
        wizard.advance().unwrap();
        wizard.advance().unwrap();

        wizard.preferences = PreferencesForm::default();
        let errors = wizard.advance().unwrap_err();
        assert!(error_messages(&errors)
            .iter()
            .any(|m| m.contains("at least one preference")));
    }

    #[test]
    fn test_full_walk_produces_submission() {
        let mut wizard = filled_wizard();

        wizard.advance().unwrap();
        wizard.advance().unwrap();

        let submission = match wizard.advance().unwrap() {
            Advance::ReadyToSubmit(submission) => submission,
            other => panic!("expected a submission, got {:?}", other),
        };

        assert_eq!(submission.name, "Sam Porter");
        assert_eq!(submission.activities.len(), 1);
        assert!(submission.prefers_female);
        assert!(matches!(submission.avatar, AvatarSource::Url(_)));
        assert_eq!(*wizard.status(), WizardStatus::Submitting);

        // While submitting, the wizard refuses to move
        assert!(matches!(wizard.advance().unwrap(), Advance::Busy));

        // A failure keeps the input for a retry
        wizard.fail("network down");
        assert!(matches!(
            wizard.advance().unwrap(),
            Advance::ReadyToSubmit(_)
        ));

        wizard.complete();
        assert_eq!(*wizard.status(), WizardStatus::Submitted);
    }

    #[test]
    fn test_player_count_adjustment_clamps() {
        let mut form = ActivitiesForm::default();
        let activity = football();

        form.toggle(&activity);
        form.adjust_player_count(&activity, -10);
        assert_eq!(form.selections[0].player_count, 1);

        form.adjust_player_count(&activity, 200);
        assert_eq!(form.selections[0].player_count, 100);
    }
}
