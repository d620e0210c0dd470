//! Application state container with an injected persistence port
//!
//! Every mutation is applied to a copy of the state, saved through the
//! store, and only then committed in memory. A failed save leaves the
//! previous state untouched.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use rand::Rng;
use tracing::{info, warn};

use crate::coach::{Coach, GeneratedPlan};
use crate::db::StateStore;
use crate::entitlement::{self, Access, Feature};
use crate::error::{AppError, AppResult, SessionError};
use crate::export;
use crate::metrics;
use crate::model::{
    AppState, ExerciseLog, Gender, GoalType, Level, PlanType, UserProfile, WeightEntry, WorkoutSession,
};
use crate::session::SessionTracker;

/// Settings form; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    pub weight: Option<f64>,
    pub height: Option<u32>,
    pub goal: Option<GoalType>,
    pub goal_description: Option<String>,
    pub injuries: Option<String>,
    pub level: Option<Level>,
    pub haptics_enabled: Option<bool>,
    pub default_plan: Option<PlanType>,
}

/// Id with a millisecond timestamp and a random suffix
pub fn new_id(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..0x10000);
    format!("{}-{}-{:04x}", prefix, Utc::now().timestamp_millis(), suffix)
}

/// Ranges offered by the onboarding pickers
fn validate_profile(p: &UserProfile) -> AppResult<()> {
    if p.name.trim().is_empty() {
        return Err(AppError::InvalidProfile("name is empty".into()));
    }
    if !(14..=99).contains(&p.age) {
        return Err(AppError::InvalidProfile(format!("age {} outside 14-99", p.age)));
    }
    if !(30.0..=200.0).contains(&p.weight) {
        return Err(AppError::InvalidProfile(format!("weight {} outside 30-200 kg", p.weight)));
    }
    if !(120..=230).contains(&p.height) {
        return Err(AppError::InvalidProfile(format!("height {} outside 120-230 cm", p.height)));
    }
    Ok(())
}

pub struct App<S: StateStore> {
    state: AppState,
    store: S,
}

impl<S: StateStore> App<S> {
    /// Load persisted state, starting empty when nothing is stored
    pub fn load(store: S) -> AppResult<Self> {
        let state = store.load()?.unwrap_or_default();
        info!(
            onboarded = state.profile.is_some(),
            history = state.history.len(),
            active = state.active.is_some(),
            "state loaded"
        );
        Ok(Self { state, store })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn profile(&self) -> AppResult<&UserProfile> {
        self.state.profile.as_ref().ok_or(AppError::NotOnboarded)
    }

    pub fn history(&self) -> &[WorkoutSession] {
        &self.state.history
    }

    pub fn active(&self) -> Option<&WorkoutSession> {
        self.state.active.as_ref()
    }

    pub fn session_detail(&self, id: &str) -> Option<&WorkoutSession> {
        self.state.history.iter().find(|s| s.id == id)
    }

    fn update<T>(&mut self, f: impl FnOnce(&mut AppState) -> AppResult<T>) -> AppResult<T> {
        let mut next = self.state.clone();
        let out = f(&mut next)?;
        if let Err(e) = self.store.save(&next) {
            warn!(error = %e, "save failed, keeping previous state");
            return Err(e.into());
        }
        self.state = next;
        Ok(out)
    }

    fn profile_mut(state: &mut AppState) -> AppResult<&mut UserProfile> {
        state.profile.as_mut().ok_or(AppError::NotOnboarded)
    }

    pub fn onboard(&mut self, profile: UserProfile) -> AppResult<()> {
        validate_profile(&profile)?;
        info!(name = %profile.name, goal = ?profile.goal, "onboarded");
        self.update(|s| {
            s.profile = Some(profile);
            Ok(())
        })
    }

    /// Apply settings; a new body weight is appended to the weight history
    pub fn update_profile(&mut self, changes: &ProfileUpdate) -> AppResult<()> {
        self.update(|s| {
            let p = Self::profile_mut(s)?;
            let mut next = p.clone();

            if let Some(name) = &changes.name {
                next.name = name.trim().to_string();
            }
            if let Some(g) = changes.gender {
                next.gender = g;
            }
            if let Some(age) = changes.age {
                next.age = age;
            }
            if let Some(h) = changes.height {
                next.height = h;
            }
            if let Some(goal) = changes.goal {
                next.goal = goal;
            }
            if let Some(d) = &changes.goal_description {
                next.goal_description = d.clone();
            }
            if let Some(i) = &changes.injuries {
                next.injuries = i.clone();
            }
            if let Some(l) = changes.level {
                next.level = l;
            }
            if let Some(h) = changes.haptics_enabled {
                next.haptics_enabled = h;
            }
            if let Some(plan) = changes.default_plan {
                next.default_plan = Some(plan);
            }
            if let Some(w) = changes.weight
                && w != next.weight
            {
                next.weight = w;
                next.weight_history.push(WeightEntry { date: Utc::now(), weight: w });
            }

            validate_profile(&next)?;
            *p = next;
            Ok(())
        })
    }

    /// Flip the PRO flag, returns the new value
    pub fn toggle_pro(&mut self) -> AppResult<bool> {
        self.update(|s| {
            let p = Self::profile_mut(s)?;
            p.is_pro = !p.is_pro;
            info!(pro = p.is_pro, "entitlement changed");
            Ok(p.is_pro)
        })
    }

    pub fn set_preferred_rest(&mut self, secs: u32) -> AppResult<()> {
        self.update(|s| {
            Self::profile_mut(s)?.preferred_rest_secs = secs;
            Ok(())
        })
    }

    /// Turn a validated plan into the active workout
    pub fn start_session(&mut self, plan: GeneratedPlan, plan_type: PlanType) -> AppResult<&WorkoutSession> {
        if self.state.active.is_some() {
            return Err(AppError::SessionInProgress);
        }
        let goal = self.profile()?.goal;
        // nothing to gate when the model sent no warm-up
        let warmup_completed = plan.warmup.is_empty();

        let exercises: Vec<ExerciseLog> = plan
            .exercises
            .into_iter()
            .enumerate()
            .map(|(i, e)| e.into_log(new_id(&format!("ex-{i}"))))
            .collect();

        let session = WorkoutSession {
            id: new_id("w"),
            date: Utc::now(),
            goal,
            plan_type,
            workout_title: plan.title,
            warmup: plan.warmup,
            exercises,
            duration_seconds: 0,
            note: None,
            warmup_completed,
            swaps_used: 0,
            tips_used: 0,
            ad_credits: 0,
        };
        info!(id = %session.id, title = %session.workout_title, exercises = session.exercises.len(), "session started");

        self.update(|s| {
            Self::profile_mut(s)?.default_plan = Some(plan_type);
            s.active = Some(session);
            Ok(())
        })?;
        self.active().ok_or(AppError::NoActiveSession)
    }

    /// Ask the coach for a plan and start it. Nothing changes on failure.
    pub async fn generate_session<C: Coach>(&mut self, coach: &C, plan_type: PlanType) -> AppResult<&WorkoutSession> {
        if self.state.active.is_some() {
            return Err(AppError::SessionInProgress);
        }
        let profile = self.profile()?;
        let plan = coach.generate_plan(profile, &self.state.history, plan_type).await?;
        self.start_session(plan, plan_type)
    }

    /// Tracker over the active workout, using the preferred rest time
    pub fn tracker(&self) -> AppResult<SessionTracker> {
        let rest = self.profile()?.preferred_rest_secs;
        let session = self.state.active.clone().ok_or(AppError::NoActiveSession)?;
        Ok(SessionTracker::new(session, rest))
    }

    /// Persist the tracker's current session as the active workout
    pub fn commit_tracker(&mut self, tracker: &SessionTracker) -> AppResult<()> {
        if tracker.is_finalized() {
            return Err(SessionError::AlreadyFinalized.into());
        }
        let session = tracker.session().clone();
        self.update(|s| {
            s.active = Some(session);
            Ok(())
        })
    }

    /// Run one tracker operation against the active workout and save it
    pub fn with_tracker<T>(
        &mut self,
        f: impl FnOnce(&mut SessionTracker) -> Result<T, SessionError>,
    ) -> AppResult<T> {
        let mut tracker = self.tracker()?;
        let out = f(&mut tracker)?;
        self.commit_tracker(&tracker)?;
        Ok(out)
    }

    fn gate(&self, feature: Feature) -> AppResult<()> {
        match entitlement::check(self.profile()?, self.state.active.as_ref(), feature) {
            Access::Granted => Ok(()),
            Access::Upsell(f) => Err(AppError::Upsell(f)),
        }
    }

    /// Replace an exercise with a coach suggestion
    pub async fn swap_exercise<C: Coach>(&mut self, coach: &C, exercise_id: &str) -> AppResult<ExerciseLog> {
        self.gate(Feature::AiSwap)?;
        let current = self
            .active()
            .ok_or(AppError::NoActiveSession)?
            .exercise(exercise_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownExercise(exercise_id.to_string()))?;

        let proposal = coach.swap_exercise(self.profile()?, &current).await?;
        let replacement = proposal.into_log(new_id("ex"));
        let out = replacement.clone();

        self.with_tracker(|t| t.replace_exercise(exercise_id, replacement))?;
        Ok(out)
    }

    /// Coaching tip for an exercise of the active workout
    pub async fn coaching_tip<C: Coach>(&mut self, coach: &C, exercise_id: &str) -> AppResult<String> {
        self.gate(Feature::AiTip)?;
        let name = self
            .active()
            .ok_or(AppError::NoActiveSession)?
            .exercise(exercise_id)
            .map(|e| e.name.clone())
            .ok_or_else(|| SessionError::UnknownExercise(exercise_id.to_string()))?;

        let tip = coach.coaching_tip(self.profile()?, &name).await?;
        self.with_tracker(|t| t.record_tip())?;
        Ok(tip)
    }

    /// Simulated rewarded ad: one extra AI use in this workout
    pub fn watch_ad(&mut self) -> AppResult<()> {
        self.with_tracker(|t| t.grant_ad_credit())?;
        info!("ad reward granted");
        Ok(())
    }

    /// Freeze the active workout, move it to history and award XP
    pub fn finish_active(&mut self, note: &str, elapsed_seconds: u64) -> AppResult<WorkoutSession> {
        let mut tracker = self.tracker()?;
        let finished = tracker.finish(note, elapsed_seconds)?;
        let record = finished.clone();

        self.update(|s| {
            let p = Self::profile_mut(s)?;
            p.progress = metrics::award_session(&p.progress);
            s.history.push(record);
            s.active = None;
            Ok(())
        })?;
        Ok(finished)
    }

    /// Drop the active workout without recording it
    pub fn abandon_active(&mut self) -> AppResult<WorkoutSession> {
        self.update(|s| s.active.take().ok_or(AppError::NoActiveSession))
    }

    /// Delete everything, profile included
    pub fn reset_account(&mut self) -> AppResult<()> {
        self.store.clear()?;
        self.state = AppState::default();
        info!("account reset");
        Ok(())
    }

    /// PDF report of the finished workouts (PRO only)
    pub fn export_pdf(&self, target: &Path, today: NaiveDate) -> AppResult<PathBuf> {
        self.gate(Feature::PdfExport)?;
        let profile = self.profile()?;
        Ok(export::export_history(profile, &self.state.history, target, today)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coach::{PlannedExercise, parse_plan};
    use crate::db::MemoryStore;
    use crate::error::{CoachError, StoreError};
    use crate::session::SetEdit;
    use std::cell::Cell;

    const PLAN: &str = r#"{
        "workoutTitle": "Push",
        "warmup": [{"name": "Krążenia ramion", "instruction": "1 min"}],
        "exercises": [
            {"name": "Wyciskanie", "muscleGroup": "klatka", "isBodyweight": false, "isTimed": false,
             "setsCount": 2, "repsTarget": 8, "suggestedWeight": 60},
            {"name": "Dipy", "muscleGroup": "triceps", "isBodyweight": true, "isTimed": false,
             "setsCount": 1, "repsTarget": 10, "suggestedWeight": 0}
        ]
    }"#;

    /// Scripted coach; `fail` makes every call fail
    #[derive(Default)]
    struct FakeCoach {
        fail: bool,
        calls: Cell<u32>,
    }

    impl Coach for FakeCoach {
        async fn generate_plan(
            &self,
            _profile: &UserProfile,
            _history: &[WorkoutSession],
            _plan: PlanType,
        ) -> Result<GeneratedPlan, CoachError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return parse_plan("{\"exercises\": []}");
            }
            parse_plan(PLAN)
        }

        async fn swap_exercise(&self, _profile: &UserProfile, _current: &ExerciseLog) -> Result<PlannedExercise, CoachError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(CoachError::Api { status: 503, body: "busy".into() });
            }
            Ok(PlannedExercise {
                name: "Rozpiętki".into(),
                muscle_group: "klatka".into(),
                is_bodyweight: false,
                is_timed: false,
                sets: 3,
                reps: Some(12),
                weight: Some(14.0),
                duration_minutes: None,
            })
        }

        async fn coaching_tip(&self, _profile: &UserProfile, exercise: &str) -> Result<String, CoachError> {
            self.calls.set(self.calls.get() + 1);
            Ok(format!("Kontroluj ruch w {exercise}."))
        }
    }

    fn onboarded() -> App<MemoryStore> {
        let mut app = App::load(MemoryStore::new()).unwrap();
        app.onboard(UserProfile::new("Kasia", 29, 62.0, 170, GoalType::Gym)).unwrap();
        app
    }

    async fn with_session() -> App<MemoryStore> {
        let mut app = onboarded();
        app.generate_session(&FakeCoach::default(), PlanType::Ppl).await.unwrap();
        app.with_tracker(|t| t.complete_warmup()).unwrap();
        app
    }

    fn first_id(app: &App<MemoryStore>) -> String {
        app.active().unwrap().exercises[0].id.clone()
    }

    #[test]
    fn test_onboarding_validates() {
        let mut app = App::load(MemoryStore::new()).unwrap();
        let too_young = UserProfile::new("X", 10, 60.0, 170, GoalType::Gym);
        assert!(matches!(app.onboard(too_young), Err(AppError::InvalidProfile(_))));
        assert!(app.state().profile.is_none());
    }

    #[test]
    fn test_state_survives_reload() {
        let store = MemoryStore::new();
        let mut app = App::load(store).unwrap();
        app.onboard(UserProfile::new("Kasia", 29, 62.0, 170, GoalType::Gym)).unwrap();
        let App { store, .. } = app;

        let reloaded = App::load(store).unwrap();
        assert_eq!(reloaded.profile().unwrap().name, "Kasia");
    }

    #[test]
    fn test_weight_change_is_recorded() {
        let mut app = onboarded();
        app.update_profile(&ProfileUpdate { weight: Some(63.5), ..Default::default() }).unwrap();
        app.update_profile(&ProfileUpdate { weight: Some(63.5), ..Default::default() }).unwrap();

        let p = app.profile().unwrap();
        assert_eq!(p.weight, 63.5);
        assert_eq!(p.weight_history.len(), 2);
    }

    #[test]
    fn test_invalid_update_keeps_profile() {
        let mut app = onboarded();
        let bad = ProfileUpdate { height: Some(40), name: Some("Nowa".into()), ..Default::default() };
        assert!(app.update_profile(&bad).is_err());
        assert_eq!(app.profile().unwrap().name, "Kasia");
    }

    #[test]
    fn test_save_failure_keeps_memory_state() {
        let mut app = onboarded();
        app.store.fail_saves = true;

        assert!(matches!(app.toggle_pro(), Err(AppError::Store(StoreError::Unavailable(_)))));
        assert!(!app.profile().unwrap().is_pro);

        app.store.fail_saves = false;
        assert!(app.toggle_pro().unwrap());
    }

    #[tokio::test]
    async fn test_generate_session_builds_workout() {
        let app = with_session().await;
        let session = app.active().unwrap();
        assert_eq!(session.workout_title, "Push");
        assert_eq!(session.exercises.len(), 2);
        assert_eq!(session.exercises[0].sets.len(), 2);
        assert_eq!(session.warmup.len(), 1);
        assert_eq!(app.profile().unwrap().default_plan, Some(PlanType::Ppl));
    }

    #[tokio::test]
    async fn test_malformed_plan_applies_nothing() {
        let mut app = onboarded();
        let coach = FakeCoach { fail: true, ..Default::default() };
        let err = app.generate_session(&coach, PlanType::Fbw).await.unwrap_err();
        assert!(matches!(err, AppError::Coach(CoachError::Malformed(_))));
        assert!(app.active().is_none());
        assert_eq!(app.profile().unwrap().default_plan, None);
    }

    #[tokio::test]
    async fn test_second_session_rejected() {
        let mut app = with_session().await;
        let coach = FakeCoach::default();
        assert!(matches!(
            app.generate_session(&coach, PlanType::Fbw).await,
            Err(AppError::SessionInProgress)
        ));
        assert_eq!(coach.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_warmup_gate_persists() {
        let mut app = onboarded();
        app.generate_session(&FakeCoach::default(), PlanType::Ppl).await.unwrap();
        let id = first_id(&app);
        assert!(matches!(
            app.with_tracker(|t| t.toggle_set_completion(&id, 0)),
            Err(AppError::Session(SessionError::WarmupPending))
        ));
        app.with_tracker(|t| t.complete_warmup()).unwrap();
        assert!(app.active().unwrap().warmup_completed);
    }

    #[tokio::test]
    async fn test_toggle_and_edit_are_saved() {
        let mut app = with_session().await;
        let id = first_id(&app);
        app.with_tracker(|t| t.edit_set_parameters(&id, 0, &SetEdit { weight: Some(65.0), ..Default::default() }))
            .unwrap();
        app.with_tracker(|t| t.toggle_set_completion(&id, 0)).unwrap();

        let set = &app.active().unwrap().exercises[0].sets[0];
        assert!(set.completed);
        assert_eq!(set.weight, Some(65.0));
    }

    #[tokio::test]
    async fn test_swap_limits_for_free_user() {
        let mut app = with_session().await;
        let coach = FakeCoach::default();
        let id = first_id(&app);

        let replacement = app.swap_exercise(&coach, &id).await.unwrap();
        assert_eq!(app.active().unwrap().exercises[0].id, replacement.id);
        assert_eq!(app.active().unwrap().swaps_used, 1);

        let err = app.swap_exercise(&coach, &replacement.id).await.unwrap_err();
        assert!(matches!(err, AppError::Upsell(Feature::AiSwap)));
        assert_eq!(coach.calls.get(), 1);

        app.watch_ad().unwrap();
        assert!(app.swap_exercise(&coach, &replacement.id).await.is_ok());
        assert_eq!(app.active().unwrap().swaps_used, 2);
    }

    #[tokio::test]
    async fn test_failed_swap_changes_nothing() {
        let mut app = with_session().await;
        let before = app.active().cloned();
        let id = first_id(&app);
        let coach = FakeCoach { fail: true, ..Default::default() };
        assert!(app.swap_exercise(&coach, &id).await.is_err());
        assert_eq!(app.active().cloned(), before);
    }

    #[tokio::test]
    async fn test_tip_counts_usage() {
        let mut app = with_session().await;
        let id = first_id(&app);
        let tip = app.coaching_tip(&FakeCoach::default(), &id).await.unwrap();
        assert!(tip.contains("Wyciskanie"));
        assert_eq!(app.active().unwrap().tips_used, 1);
    }

    #[tokio::test]
    async fn test_finish_moves_to_history() {
        let mut app = with_session().await;
        let done = app.finish_active("mocno", 2400).unwrap();

        assert_eq!(done.duration_seconds, 2400);
        assert!(app.active().is_none());
        assert_eq!(app.history().len(), 1);
        assert_eq!(app.history()[0], done);
        assert_eq!(app.profile().unwrap().progress.xp, 150);
        assert!(matches!(app.tracker(), Err(AppError::NoActiveSession)));
        assert!(app.session_detail(&done.id).is_some());
    }

    #[tokio::test]
    async fn test_commit_finalized_tracker_rejected() {
        let mut app = with_session().await;
        let mut tracker = app.tracker().unwrap();
        tracker.finish("", 10).unwrap();
        assert!(matches!(
            app.commit_tracker(&tracker),
            Err(AppError::Session(SessionError::AlreadyFinalized))
        ));
    }

    #[tokio::test]
    async fn test_abandon_and_reset() {
        let mut app = with_session().await;
        app.abandon_active().unwrap();
        assert!(app.active().is_none());
        assert!(app.history().is_empty());

        app.reset_account().unwrap();
        assert!(matches!(app.profile(), Err(AppError::NotOnboarded)));
        assert!(app.store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pdf_export_requires_pro() {
        let mut app = with_session().await;
        app.finish_active("", 60).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();

        assert!(matches!(
            app.export_pdf(dir.path(), today),
            Err(AppError::Upsell(Feature::PdfExport))
        ));

        app.toggle_pro().unwrap();
        let path = app.export_pdf(dir.path(), today).unwrap();
        assert!(path.exists());
    }
}
