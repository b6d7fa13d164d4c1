use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::models::LearnedSkill;

// Milestone definitions. The catalog is fixed at compile time; unlocks are
// per-user rows owned by the database.
pub struct Achievement {
    pub id: i64,
    pub title: &'static str,
    pub description: &'static str,
    pub condition: fn(&[LearnedSkill], u32) -> bool,
}

pub const CATALOG: &[Achievement] = &[
    Achievement {
        id: 1,
        title: "Initiate",
        description: "Learn your very first skill",
        condition: |skills, _| !skills.is_empty(),
    },
    Achievement {
        id: 3,
        title: "Skilled learner",
        description: "Learn 5 skills in total",
        condition: |skills, _| skills.len() >= 5,
    },
    Achievement {
        id: 6,
        title: "MicroMaster",
        description: "Learn 10 skills total",
        condition: |skills, _| skills.len() >= 10,
    },
    Achievement {
        id: 2,
        title: "3 Day Streak",
        description: "Maintain a 3 day streak",
        condition: |_, streak| streak >= 3,
    },
    Achievement {
        id: 4,
        title: "5 Day Streak",
        description: "Maintain a 5 day streak",
        condition: |_, streak| streak >= 5,
    },
    Achievement {
        id: 5,
        title: "10 Day Streak",
        description: "Maintain a 10 day streak",
        condition: |_, streak| streak >= 10,
    },
];

pub fn find(id: i64) -> Option<&'static Achievement> {
    CATALOG.iter().find(|a| a.id == id)
}

// Catalog ids that are satisfied now and not yet unlocked. Pure; ordering
// follows the catalog.
pub fn evaluate(learned: &[LearnedSkill], streak: u32, unlocked: &[i64]) -> Vec<i64> {
    CATALOG
        .iter()
        .filter(|a| !unlocked.contains(&a.id) && (a.condition)(learned, streak))
        .map(|a| a.id)
        .collect()
}

#[derive(Debug, Default)]
pub struct UnlockReport {
    pub unlocked: Vec<i64>,
    pub failures: Vec<(i64, String)>,
}

// Persist every newly satisfied unlock. One failed write is recorded and the
// remaining candidates are still attempted; re-running with an id already in
// the unlocked set is a no-op.
pub fn unlock_new(
    db: &Database,
    user_id: &str,
    learned: &[LearnedSkill],
    streak: u32,
    now: DateTime<Utc>,
) -> rusqlite::Result<UnlockReport> {
    let already = db.unlocked_achievements(user_id)?;
    let eligible = evaluate(learned, streak, &already);

    let mut report = UnlockReport::default();
    for id in eligible {
        match db.unlock_achievement(user_id, id, now) {
            // inserted=false means another pass beat us to it; not a failure
            Ok(_) => report.unlocked.push(id),
            Err(e) => report.failures.push((id, e.to_string())),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learned(n: usize) -> Vec<LearnedSkill> {
        (0..n)
            .map(|i| LearnedSkill {
                skill_id: i as i64 + 1,
                skill_title: format!("Skill {}", i + 1),
                category_title: "Test".to_string(),
                learned_at: "2024-01-01T12:00:00+00:00".to_string(),
            })
            .collect()
    }

    mod catalog_tests {
        use super::*;

        #[test]
        fn catalog_ids_are_unique() {
            let mut ids: Vec<i64> = CATALOG.iter().map(|a| a.id).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), CATALOG.len());
        }

        #[test]
        fn find_known_and_unknown() {
            assert_eq!(find(1).unwrap().title, "Initiate");
            assert!(find(999).is_none());
        }
    }

    mod evaluate_tests {
        use super::*;

        #[test]
        fn nothing_unlocks_for_a_new_user() {
            assert!(evaluate(&[], 0, &[]).is_empty());
        }

        #[test]
        fn first_skill_unlocks_initiate() {
            assert_eq!(evaluate(&learned(1), 0, &[]), vec![1]);
        }

        #[test]
        fn skill_count_thresholds() {
            assert_eq!(evaluate(&learned(5), 0, &[]), vec![1, 3]);
            assert_eq!(evaluate(&learned(10), 0, &[]), vec![1, 3, 6]);
        }

        #[test]
        fn streak_thresholds() {
            assert_eq!(evaluate(&[], 3, &[]), vec![2]);
            assert_eq!(evaluate(&[], 5, &[]), vec![2, 4]);
            assert_eq!(evaluate(&[], 10, &[]), vec![2, 4, 5]);
        }

        #[test]
        fn already_unlocked_ids_are_skipped() {
            assert_eq!(evaluate(&learned(5), 3, &[1, 2]), vec![3]);
        }

        #[test]
        fn fully_unlocked_set_yields_nothing() {
            assert!(evaluate(&learned(10), 10, &[1, 2, 3, 4, 5, 6]).is_empty());
        }
    }

    mod unlock_tests {
        use super::*;
        use crate::db::Database;

        fn setup_db() -> Database {
            let db = Database::open(":memory:").expect("Failed to create in-memory database");
            db.init().expect("Failed to initialize database");
            db
        }

        #[test]
        fn unlocks_are_persisted() {
            let db = setup_db();
            let user = db.create_user("alice", None).unwrap();

            let report = unlock_new(&db, &user, &learned(1), 3, Utc::now()).unwrap();
            assert_eq!(report.unlocked, vec![1, 2]);
            assert!(report.failures.is_empty());
            assert_eq!(db.unlocked_achievements(&user).unwrap(), vec![1, 2]);
        }

        #[test]
        fn rerun_is_a_noop() {
            let db = setup_db();
            let user = db.create_user("alice", None).unwrap();

            unlock_new(&db, &user, &learned(1), 0, Utc::now()).unwrap();
            let report = unlock_new(&db, &user, &learned(1), 0, Utc::now()).unwrap();

            assert!(report.unlocked.is_empty());
            assert!(report.failures.is_empty());
            assert_eq!(db.unlocked_achievements(&user).unwrap(), vec![1]);
        }

        #[test]
        fn new_milestones_unlock_incrementally() {
            let db = setup_db();
            let user = db.create_user("alice", None).unwrap();

            unlock_new(&db, &user, &learned(1), 0, Utc::now()).unwrap();
            let report = unlock_new(&db, &user, &learned(5), 3, Utc::now()).unwrap();

            assert_eq!(report.unlocked, vec![3, 2]);
            assert_eq!(db.unlocked_achievements(&user).unwrap(), vec![1, 2, 3]);
        }

        #[test]
        fn one_failed_write_does_not_block_the_rest() {
            let db = setup_db();
            // No such user: every insert violates the foreign key, and every
            // candidate must still have been attempted.
            let report = unlock_new(&db, "ghost", &learned(5), 3, Utc::now()).unwrap();

            assert!(report.unlocked.is_empty());
            let failed_ids: Vec<i64> = report.failures.iter().map(|(id, _)| *id).collect();
            assert_eq!(failed_ids, vec![1, 3, 2]);
        }
    }
}
