use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::db::Database;
use crate::models::{QuizOutcome, Skill};
use crate::progress::{self, ProgressReport};
use crate::store::{MysteryScratch, Scratch, StoreError};

// One challenge window per day, with two replacement draws.
pub const MAX_REFRESHES: u32 = 2;
pub const SESSION_DURATION_HOURS: i64 = 24;

pub fn session_duration() -> Duration {
    Duration::hours(SESSION_DURATION_HOURS)
}

#[derive(Debug, Error)]
pub enum MysteryError {
    #[error("refresh limit reached for today's mystery session")]
    RefreshLimitReached,
    #[error("no mystery skill is currently assigned")]
    NoActiveSkill,
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub enum MysteryStatus {
    // A challenge is assigned and waiting on the quiz.
    Active {
        skill: Skill,
        refreshes_left: u32,
    },
    // Today's challenge was completed; nothing new until `until`.
    Cooldown {
        until: DateTime<Utc>,
    },
    // No eligible skill remains for this session window.
    Exhausted,
}

#[derive(Debug)]
pub enum CompleteResult {
    Passed {
        report: ProgressReport,
        cooldown_until: DateTime<Utc>,
    },
    // Imperfect score: nothing recorded, the user may retry.
    TryAgain {
        correct: usize,
        total: usize,
    },
}

// Drives the per-user mystery challenge over the scratch record. The clock
// is always passed in, so expiry and cooldown boundaries are testable.
pub struct MysteryManager<'a> {
    db: &'a Database,
    scratch: &'a Scratch,
    user_id: String,
}

impl<'a> MysteryManager<'a> {
    pub fn new(db: &'a Database, scratch: &'a Scratch, user_id: &str) -> Self {
        Self {
            db,
            scratch,
            user_id: user_id.to_string(),
        }
    }

    // Entry point on every visit: resolves cooldown, expiry and assignment
    // and returns what the user should see.
    pub fn open(&self, now: DateTime<Utc>) -> Result<MysteryStatus, MysteryError> {
        let state = self.scratch.load_mystery(&self.user_id)?;

        if let Some(state) = &state {
            if let Some(until) = parse_timestamp(state.complete_until.as_deref()) {
                if until > now {
                    return Ok(MysteryStatus::Cooldown { until });
                }
                // Cooldown has elapsed: the cycle starts over.
                self.scratch.clear_mystery(&self.user_id)?;
                return self.start_session(now);
            }
        }

        match state {
            None => self.start_session(now),
            Some(state) => {
                let fresh_enough = parse_timestamp(state.session_start.as_deref())
                    .map(|started| now - started <= session_duration())
                    .unwrap_or(false);

                if !fresh_enough {
                    self.scratch.clear_mystery(&self.user_id)?;
                    return self.start_session(now);
                }

                match state.assigned_skill_id {
                    Some(id) => match self.db.get_skill(id)? {
                        Some(skill) => Ok(MysteryStatus::Active {
                            skill,
                            refreshes_left: MAX_REFRESHES.saturating_sub(state.refresh_count),
                        }),
                        // Assigned skill vanished from the catalog; draw again
                        // within the same session budget.
                        None => self.assign(state),
                    },
                    None => self.assign(state),
                }
            }
        }
    }

    // Swap the assigned skill for a new draw. Rejected once the budget is
    // spent, with no state change.
    pub fn refresh(&self, now: DateTime<Utc>) -> Result<MysteryStatus, MysteryError> {
        match self.open(now)? {
            MysteryStatus::Active { .. } => {}
            other => return Ok(other),
        }

        let mut state = self
            .scratch
            .load_mystery(&self.user_id)?
            .unwrap_or_default();

        if state.refresh_count >= MAX_REFRESHES {
            return Err(MysteryError::RefreshLimitReached);
        }

        state.refresh_count += 1;
        state.assigned_skill_id = None;
        self.scratch.save_mystery(&self.user_id, &state)?;
        self.assign(state)
    }

    // Hand back the quiz outcome for the assigned skill. A perfect score
    // records the completion, refreshes the derived profile and starts the
    // cooldown; anything else leaves the session as it was.
    pub fn complete(
        &self,
        outcome: &QuizOutcome,
        now: DateTime<Utc>,
    ) -> Result<CompleteResult, MysteryError> {
        if !outcome.all_correct() {
            return Ok(CompleteResult::TryAgain {
                correct: outcome.correct_count,
                total: outcome.total(),
            });
        }

        let mut state = self
            .scratch
            .load_mystery(&self.user_id)?
            .unwrap_or_default();
        let skill_id = state.assigned_skill_id.ok_or(MysteryError::NoActiveSkill)?;

        // Duplicate completions come back as success with nothing written.
        self.db.record_completion(&self.user_id, skill_id, now)?;
        let report = progress::sync(self.db, &self.user_id, now)?;

        let until = now + session_duration();
        state.complete_until = Some(until.to_rfc3339());
        self.scratch.save_mystery(&self.user_id, &state)?;

        Ok(CompleteResult::Passed {
            report,
            cooldown_until: until,
        })
    }

    fn start_session(&self, now: DateTime<Utc>) -> Result<MysteryStatus, MysteryError> {
        let state = MysteryScratch {
            session_start: Some(now.to_rfc3339()),
            ..Default::default()
        };
        self.scratch.save_mystery(&self.user_id, &state)?;
        self.assign(state)
    }

    fn assign(&self, mut state: MysteryScratch) -> Result<MysteryStatus, MysteryError> {
        match self
            .db
            .pick_mystery_skill(&self.user_id, &state.shown_skill_ids)?
        {
            Some(skill) => {
                state.assigned_skill_id = Some(skill.id);
                state.shown_skill_ids.push(skill.id);
                self.scratch.save_mystery(&self.user_id, &state)?;
                Ok(MysteryStatus::Active {
                    refreshes_left: MAX_REFRESHES.saturating_sub(state.refresh_count),
                    skill,
                })
            }
            None => Ok(MysteryStatus::Exhausted),
        }
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
