//! Session tracker - the in-progress workout and its state transitions

use tracing::{debug, info};

use crate::error::SessionError;
use crate::model::{ExerciseLog, WorkoutSession};
use crate::timer::{RestComplete, RestTimer};

type Result<T> = std::result::Result<T, SessionError>;

/// Partial overwrite of a set's parameters; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetEdit {
    pub weight: Option<f64>,
    pub reps: Option<u32>,
    pub duration_minutes: Option<u32>,
    pub difficulty: Option<u8>,
}

/// What happened after a set toggle
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    pub completed: bool,
    /// Set when the rest countdown finished at once (zero rest preference)
    pub rest_signal: Option<RestComplete>,
    /// Focused exercise after the toggle
    pub focus: Option<String>,
}

/// Owns the active workout until it is finished
#[derive(Debug)]
pub struct SessionTracker {
    session: WorkoutSession,
    focused: Option<String>,
    rest: RestTimer,
    rest_secs: u32,
    finalized: bool,
}

impl SessionTracker {
    /// Wrap an active session; `rest_secs` is the user's preferred rest
    pub fn new(session: WorkoutSession, rest_secs: u32) -> Self {
        let mut tracker = Self {
            session,
            focused: None,
            rest: RestTimer::new(),
            rest_secs,
            finalized: false,
        };
        if tracker.session.warmup_completed {
            tracker.focused = tracker.first_incomplete();
        }
        tracker
    }

    pub fn session(&self) -> &WorkoutSession {
        &self.session
    }

    pub fn into_session(self) -> WorkoutSession {
        self.session
    }

    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    pub fn rest(&self) -> &RestTimer {
        &self.rest
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn elapsed(&self) -> u64 {
        self.session.duration_seconds
    }

    pub fn set_rest_secs(&mut self, secs: u32) {
        self.rest_secs = secs;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finalized {
            return Err(SessionError::AlreadyFinalized);
        }
        Ok(())
    }

    fn first_incomplete(&self) -> Option<String> {
        self.session
            .exercises
            .iter()
            .find(|e| !e.is_done())
            .map(|e| e.id.clone())
    }

    fn position(&self, exercise_id: &str) -> Result<usize> {
        self.session
            .exercises
            .iter()
            .position(|e| e.id == exercise_id)
            .ok_or_else(|| SessionError::UnknownExercise(exercise_id.to_string()))
    }

    /// Open the warm-up gate so working sets can be logged
    pub fn complete_warmup(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.session.warmup_completed = true;
        if self.focused.is_none() {
            self.focused = self.first_incomplete();
        }
        info!(session = %self.session.id, "warm-up completed");
        Ok(())
    }

    /// Move focus by hand (expanding another exercise)
    pub fn focus(&mut self, exercise_id: &str) -> Result<()> {
        self.ensure_open()?;
        self.position(exercise_id)?;
        self.focused = Some(exercise_id.to_string());
        Ok(())
    }

    /// Flip the completed flag of one set.
    ///
    /// Completing a set starts the rest countdown; finishing the last set of
    /// an exercise moves focus to the first exercise that still has work left.
    pub fn toggle_set_completion(&mut self, exercise_id: &str, set_index: usize) -> Result<ToggleOutcome> {
        self.ensure_open()?;
        if !self.session.warmup_completed {
            return Err(SessionError::WarmupPending);
        }

        let pos = self.position(exercise_id)?;
        let exercise = &mut self.session.exercises[pos];
        let is_timed = exercise.is_timed;
        let is_bodyweight = exercise.is_bodyweight;
        let set = exercise
            .sets
            .get_mut(set_index)
            .ok_or_else(|| SessionError::UnknownSet {
                exercise_id: exercise_id.to_string(),
                index: set_index,
            })?;

        if set.completed {
            set.completed = false;
            debug!(exercise = exercise_id, set = set_index, "set reopened");
            return Ok(ToggleOutcome {
                completed: false,
                rest_signal: None,
                focus: self.focused.clone(),
            });
        }

        let missing = if is_timed {
            set.duration_minutes.is_none().then_some("duration")
        } else if set.reps.is_none() {
            Some("reps")
        } else if !is_bodyweight && set.weight.is_none() {
            Some("weight")
        } else {
            None
        };
        if let Some(missing) = missing {
            return Err(SessionError::IncompleteSet {
                exercise_id: exercise_id.to_string(),
                index: set_index,
                missing,
            });
        }

        set.completed = true;
        let exercise_done = exercise.is_done();
        debug!(exercise = exercise_id, set = set_index, "set completed");

        let rest_signal = self.rest.start(self.rest_secs as i64);

        if exercise_done {
            self.focused = self.first_incomplete();
            info!(
                exercise = exercise_id,
                next = self.focused.as_deref().unwrap_or("-"),
                "exercise finished"
            );
        }

        Ok(ToggleOutcome {
            completed: true,
            rest_signal,
            focus: self.focused.clone(),
        })
    }

    /// Overwrite weight/reps/duration/difficulty of one set
    pub fn edit_set_parameters(&mut self, exercise_id: &str, set_index: usize, edit: &SetEdit) -> Result<()> {
        self.ensure_open()?;
        if let Some(w) = edit.weight
            && (w < 0.0 || !w.is_finite())
        {
            return Err(SessionError::InvalidParameter(format!("weight {w}")));
        }
        if let Some(d) = edit.difficulty
            && !(1..=5).contains(&d)
        {
            return Err(SessionError::InvalidParameter(format!("difficulty {d} (1-5)")));
        }

        let pos = self.position(exercise_id)?;
        let set = self.session.exercises[pos]
            .sets
            .get_mut(set_index)
            .ok_or_else(|| SessionError::UnknownSet {
                exercise_id: exercise_id.to_string(),
                index: set_index,
            })?;

        if let Some(w) = edit.weight {
            set.weight = Some(w);
        }
        if let Some(r) = edit.reps {
            set.reps = Some(r);
        }
        if let Some(m) = edit.duration_minutes {
            set.duration_minutes = Some(m);
        }
        if let Some(d) = edit.difficulty {
            set.difficulty = d;
        }
        Ok(())
    }

    /// Swap an exercise in place; the replacement starts with all sets open
    pub fn replace_exercise(&mut self, exercise_id: &str, mut replacement: ExerciseLog) -> Result<()> {
        self.ensure_open()?;
        if replacement.sets.is_empty() {
            return Err(SessionError::EmptyExercise);
        }
        let pos = self.position(exercise_id)?;

        for set in &mut replacement.sets {
            set.completed = false;
        }
        info!(from = exercise_id, to = %replacement.name, "exercise swapped");

        if self.focused.as_deref() == Some(exercise_id) {
            self.focused = Some(replacement.id.clone());
        }
        self.session.exercises[pos] = replacement;
        self.session.swaps_used += 1;

        if self.session.warmup_completed && self.focused.is_none() {
            self.focused = self.first_incomplete();
        }
        Ok(())
    }

    /// Remove an exercise from the current workout
    pub fn delete_exercise(&mut self, exercise_id: &str) -> Result<ExerciseLog> {
        self.ensure_open()?;
        let pos = self.position(exercise_id)?;
        let removed = self.session.exercises.remove(pos);
        if self.focused.as_deref() == Some(exercise_id) {
            self.focused = if self.session.warmup_completed {
                self.first_incomplete()
            } else {
                None
            };
        }
        Ok(removed)
    }

    pub fn record_tip(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.session.tips_used += 1;
        Ok(())
    }

    pub fn grant_ad_credit(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.session.ad_credits += 1;
        Ok(())
    }

    /// One second of wall time: session clock plus rest countdown
    pub fn tick(&mut self) -> Result<Option<RestComplete>> {
        self.ensure_open()?;
        self.session.duration_seconds += 1;
        Ok(self.rest.tick())
    }

    /// Raise the clock to an externally measured value; never lowers it
    pub fn sync_elapsed(&mut self, secs: u64) -> Result<()> {
        self.ensure_open()?;
        self.session.duration_seconds = self.session.duration_seconds.max(secs);
        Ok(())
    }

    /// Freeze the session and hand back the final record
    pub fn finish(&mut self, note: &str, elapsed_seconds: u64) -> Result<WorkoutSession> {
        self.ensure_open()?;
        if elapsed_seconds < self.session.duration_seconds {
            return Err(SessionError::ElapsedWentBackwards {
                given: elapsed_seconds,
                tracked: self.session.duration_seconds,
            });
        }

        let note = note.trim();
        self.session.note = (!note.is_empty()).then(|| note.to_string());
        self.session.duration_seconds = elapsed_seconds;
        self.rest.cancel();
        self.focused = None;
        self.finalized = true;

        info!(
            session = %self.session.id,
            elapsed = elapsed_seconds,
            sets = self.session.completed_sets(),
            "session finished"
        );
        Ok(self.session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GoalType, PlanType, SetLog};
    use chrono::Utc;

    fn exercise(id: &str, sets: usize) -> ExerciseLog {
        ExerciseLog {
            id: id.to_string(),
            name: format!("Ćwiczenie {id}"),
            muscle_group: "klatka".into(),
            is_bodyweight: false,
            is_timed: false,
            sets: (0..sets)
                .map(|_| SetLog::planned(Some(10), Some(40.0), None))
                .collect(),
        }
    }

    fn session(exercises: Vec<ExerciseLog>) -> WorkoutSession {
        WorkoutSession {
            id: "s1".into(),
            date: Utc::now(),
            goal: GoalType::Gym,
            plan_type: PlanType::Fbw,
            workout_title: "Test".into(),
            warmup: vec![],
            exercises,
            duration_seconds: 0,
            note: None,
            warmup_completed: true,
            swaps_used: 0,
            tips_used: 0,
            ad_credits: 0,
        }
    }

    fn tracker(exercises: Vec<ExerciseLog>) -> SessionTracker {
        SessionTracker::new(session(exercises), 60)
    }

    #[test]
    fn test_focus_advances_through_exercises() {
        let mut t = tracker(vec![exercise("A", 2), exercise("B", 1)]);
        assert_eq!(t.focused(), Some("A"));

        t.toggle_set_completion("A", 0).unwrap();
        assert_eq!(t.focused(), Some("A"));

        let outcome = t.toggle_set_completion("A", 1).unwrap();
        assert_eq!(outcome.focus.as_deref(), Some("B"));

        t.toggle_set_completion("B", 0).unwrap();
        assert_eq!(t.focused(), None);
    }

    #[test]
    fn test_focus_skips_already_finished_exercises() {
        let mut done = exercise("B", 1);
        done.sets[0].completed = true;
        let mut t = tracker(vec![exercise("A", 1), done, exercise("C", 1)]);

        t.toggle_set_completion("A", 0).unwrap();
        assert_eq!(t.focused(), Some("C"));
    }

    #[test]
    fn test_focus_returns_to_earlier_incomplete_exercise() {
        let mut t = tracker(vec![exercise("A", 1), exercise("B", 1)]);
        t.toggle_set_completion("B", 0).unwrap();
        assert_eq!(t.focused(), Some("A"));
    }

    #[test]
    fn test_completion_starts_rest_timer() {
        let mut t = tracker(vec![exercise("A", 2)]);
        t.toggle_set_completion("A", 0).unwrap();
        assert_eq!(t.rest().remaining(), Some(60));
    }

    #[test]
    fn test_reopening_does_not_start_rest() {
        let mut t = tracker(vec![exercise("A", 2)]);
        t.toggle_set_completion("A", 0).unwrap();
        t.toggle_set_completion("A", 0).unwrap();
        t.tick().unwrap();
        // still the first countdown, one second in
        assert_eq!(t.rest().remaining(), Some(59));
        assert!(!t.session().exercises[0].sets[0].completed);
    }

    #[test]
    fn test_zero_rest_fires_immediately() {
        let mut t = SessionTracker::new(session(vec![exercise("A", 1)]), 0);
        let outcome = t.toggle_set_completion("A", 0).unwrap();
        assert!(outcome.rest_signal.is_some());
        assert!(t.rest().is_idle());
    }

    #[test]
    fn test_new_completion_restarts_rest() {
        let mut t = SessionTracker::new(session(vec![exercise("A", 2)]), 3);
        t.toggle_set_completion("A", 0).unwrap();
        t.tick().unwrap();
        t.toggle_set_completion("A", 1).unwrap();

        let signals: Vec<_> = (0..6).filter_map(|_| t.tick().unwrap()).collect();
        assert_eq!(signals, vec![RestComplete { countdown: 2 }]);
    }

    #[test]
    fn test_warmup_gate() {
        let mut s = session(vec![exercise("A", 1)]);
        s.warmup_completed = false;
        let mut t = SessionTracker::new(s, 60);
        assert_eq!(t.focused(), None);
        assert_eq!(
            t.toggle_set_completion("A", 0),
            Err(SessionError::WarmupPending)
        );

        t.complete_warmup().unwrap();
        assert_eq!(t.focused(), Some("A"));
        assert!(t.toggle_set_completion("A", 0).is_ok());
    }

    #[test]
    fn test_cannot_complete_set_without_weight() {
        let mut ex = exercise("A", 1);
        ex.sets[0].weight = None;
        let mut t = tracker(vec![ex]);
        let err = t.toggle_set_completion("A", 0).unwrap_err();
        assert!(matches!(err, SessionError::IncompleteSet { missing: "weight", .. }));
        assert!(!t.session().exercises[0].sets[0].completed);
    }

    #[test]
    fn test_bodyweight_needs_reps_only() {
        let mut ex = exercise("A", 1);
        ex.is_bodyweight = true;
        ex.sets[0].weight = None;
        let mut t = tracker(vec![ex]);
        assert!(t.toggle_set_completion("A", 0).unwrap().completed);
    }

    #[test]
    fn test_timed_needs_duration() {
        let mut ex = exercise("A", 1);
        ex.is_timed = true;
        let mut t = tracker(vec![ex]);
        let err = t.toggle_set_completion("A", 0).unwrap_err();
        assert!(matches!(err, SessionError::IncompleteSet { missing: "duration", .. }));

        t.edit_set_parameters("A", 0, &SetEdit { duration_minutes: Some(20), ..Default::default() })
            .unwrap();
        assert!(t.toggle_set_completion("A", 0).is_ok());
    }

    #[test]
    fn test_unknown_exercise_and_set() {
        let mut t = tracker(vec![exercise("A", 1)]);
        assert_eq!(
            t.toggle_set_completion("Z", 0),
            Err(SessionError::UnknownExercise("Z".into()))
        );
        assert!(matches!(
            t.toggle_set_completion("A", 5),
            Err(SessionError::UnknownSet { index: 5, .. })
        ));
    }

    #[test]
    fn test_edit_has_no_side_effects() {
        let mut t = tracker(vec![exercise("A", 2)]);
        let edit = SetEdit { weight: Some(55.5), reps: Some(6), ..Default::default() };
        t.edit_set_parameters("A", 1, &edit).unwrap();

        let set = &t.session().exercises[0].sets[1];
        assert_eq!(set.weight, Some(55.5));
        assert_eq!(set.reps, Some(6));
        assert!(!set.completed);
        assert!(t.rest().is_idle());
        assert_eq!(t.focused(), Some("A"));
    }

    #[test]
    fn test_edit_rejects_bad_values() {
        let mut t = tracker(vec![exercise("A", 1)]);
        let bad_weight = SetEdit { weight: Some(-1.0), ..Default::default() };
        assert!(t.edit_set_parameters("A", 0, &bad_weight).is_err());
        let bad_difficulty = SetEdit { difficulty: Some(6), ..Default::default() };
        assert!(t.edit_set_parameters("A", 0, &bad_difficulty).is_err());
    }

    #[test]
    fn test_swap_preserves_position_and_resets_sets() {
        let mut t = tracker(vec![exercise("A", 1), exercise("B", 2), exercise("C", 1)]);
        t.toggle_set_completion("B", 0).unwrap();

        let mut replacement = exercise("X", 3);
        for s in &mut replacement.sets {
            s.completed = true;
        }
        t.replace_exercise("B", replacement).unwrap();

        let ids: Vec<_> = t.session().exercises.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "X", "C"]);
        assert!(t.session().exercises[1].sets.iter().all(|s| !s.completed));
        assert_eq!(t.session().swaps_used, 1);
    }

    #[test]
    fn test_swap_moves_focus_to_replacement() {
        let mut t = tracker(vec![exercise("A", 1), exercise("B", 1)]);
        t.replace_exercise("A", exercise("X", 1)).unwrap();
        assert_eq!(t.focused(), Some("X"));
    }

    #[test]
    fn test_swap_rejects_empty_exercise() {
        let mut t = tracker(vec![exercise("A", 1)]);
        assert_eq!(
            t.replace_exercise("A", exercise("X", 0)),
            Err(SessionError::EmptyExercise)
        );
    }

    #[test]
    fn test_delete_exercise_refocuses() {
        let mut t = tracker(vec![exercise("A", 1), exercise("B", 1)]);
        let removed = t.delete_exercise("A").unwrap();
        assert_eq!(removed.id, "A");
        assert_eq!(t.focused(), Some("B"));
    }

    #[test]
    fn test_tick_is_monotonic() {
        let mut t = tracker(vec![exercise("A", 1)]);
        t.tick().unwrap();
        t.tick().unwrap();
        assert_eq!(t.elapsed(), 2);
        t.sync_elapsed(1).unwrap();
        assert_eq!(t.elapsed(), 2);
        t.sync_elapsed(10).unwrap();
        assert_eq!(t.elapsed(), 10);
    }

    #[test]
    fn test_finish_freezes_session() {
        let mut t = tracker(vec![exercise("A", 1)]);
        let done = t.finish("  dobry trening ", 1800).unwrap();
        assert_eq!(done.duration_seconds, 1800);
        assert_eq!(done.note.as_deref(), Some("dobry trening"));
        assert!(t.is_finalized());

        assert_eq!(t.toggle_set_completion("A", 0), Err(SessionError::AlreadyFinalized));
        assert_eq!(
            t.edit_set_parameters("A", 0, &SetEdit::default()),
            Err(SessionError::AlreadyFinalized)
        );
        assert_eq!(t.replace_exercise("A", exercise("X", 1)), Err(SessionError::AlreadyFinalized));
        assert_eq!(t.tick(), Err(SessionError::AlreadyFinalized));
        assert_eq!(t.delete_exercise("A"), Err(SessionError::AlreadyFinalized));
        assert_eq!(t.record_tip(), Err(SessionError::AlreadyFinalized));
        assert_eq!(t.grant_ad_credit(), Err(SessionError::AlreadyFinalized));
        assert_eq!(t.complete_warmup(), Err(SessionError::AlreadyFinalized));
        assert_eq!(t.sync_elapsed(5000), Err(SessionError::AlreadyFinalized));
        assert_eq!(t.focus("A"), Err(SessionError::AlreadyFinalized));
        assert_eq!(t.finish("", 1900), Err(SessionError::AlreadyFinalized));
        assert_eq!(t.session().duration_seconds, 1800);
        assert_eq!(t.session().exercises.len(), 1);
        assert_eq!((t.session().tips_used, t.session().ad_credits), (0, 0));
    }

    #[test]
    fn test_finish_rejects_smaller_elapsed() {
        let mut t = tracker(vec![exercise("A", 1)]);
        t.sync_elapsed(100).unwrap();
        assert!(matches!(
            t.finish("", 50),
            Err(SessionError::ElapsedWentBackwards { given: 50, tracked: 100 })
        ));
        assert!(!t.is_finalized());
    }

    #[test]
    fn test_empty_note_becomes_none() {
        let mut t = tracker(vec![exercise("A", 1)]);
        let done = t.finish("   ", 0).unwrap();
        assert_eq!(done.note, None);
    }
}
