use chrono::{DateTime, Local, Utc};

use crate::achievements;
use crate::db::Database;
use crate::models::{self, Profile};
use crate::streak;

// Outcome of one derivation pass: the refreshed profile plus whatever
// achievements unlocked along the way.
#[derive(Debug)]
pub struct ProgressReport {
    pub profile: Profile,
    pub newly_unlocked: Vec<i64>,
    pub unlock_failures: Vec<(i64, String)>,
}

// Recompute and persist everything derived from the completion set: learned
// count, points, level, streak, then achievement unlocks. The set is fetched
// once; the streak is derived from that same snapshot, and achievements are
// evaluated only after both are known.
pub fn sync(db: &Database, user_id: &str, now: DateTime<Utc>) -> rusqlite::Result<ProgressReport> {
    let completions = db.list_completions(user_id)?;

    let learned = completions.len() as i64;
    let points = models::points_for(learned);
    let level = models::level_for(points);

    let today = now.with_timezone(&Local).date_naive();
    let streak = streak::current_streak(&completions, today);

    db.update_derived(user_id, learned, points, level, streak as i64)?;

    let report = achievements::unlock_new(db, user_id, &completions, streak, now)?;

    let profile = db
        .get_profile(user_id)?
        .ok_or(rusqlite::Error::QueryReturnedNoRows)?;

    Ok(ProgressReport {
        profile,
        newly_unlocked: report.unlocked,
        unlock_failures: report.failures,
    })
}
