use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rusqlite::{params, Connection, Result};
use std::path::Path;

use crate::models::{
    Category, FriendProfile, FriendRequest, LearnedSkill, Profile, QuizQuestion, RequestStatus,
    Skill,
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                skills_learnt INTEGER NOT NULL DEFAULT 0,
                points INTEGER NOT NULL DEFAULT 0,
                level INTEGER NOT NULL DEFAULT 0,
                streak INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS skills (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                video_url TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS quizzes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                skill_id INTEGER NOT NULL,
                question TEXT NOT NULL,
                correct_answer TEXT NOT NULL,
                wrong_answer_1 TEXT NOT NULL,
                wrong_answer_2 TEXT NOT NULL,
                wrong_answer_3 TEXT NOT NULL,
                FOREIGN KEY (skill_id) REFERENCES skills(id) ON DELETE CASCADE
            );

            -- Completions. The composite key makes the insert idempotent: a
            -- second completion of the same skill is a constraint violation,
            -- reported to callers as "already recorded" rather than an error.
            CREATE TABLE IF NOT EXISTS users_learned_skills (
                user_id TEXT NOT NULL,
                skill_id INTEGER NOT NULL,
                learned_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, skill_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (skill_id) REFERENCES skills(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS achievements_unlocked (
                user_id TEXT NOT NULL,
                achievement_id INTEGER NOT NULL,
                unlocked_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, achievement_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Accepted rows double as the friend edges; friendship is always
            -- checked in both directions.
            CREATE TABLE IF NOT EXISTS friend_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sender_id TEXT NOT NULL,
                receiver_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending', 'accepted', 'rejected')),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (sender_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (receiver_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_skills_category ON skills(category_id);
            CREATE INDEX IF NOT EXISTS idx_quizzes_skill ON quizzes(skill_id);
            CREATE INDEX IF NOT EXISTS idx_learned_user ON users_learned_skills(user_id);
            CREATE INDEX IF NOT EXISTS idx_requests_receiver ON friend_requests(receiver_id, status);
            CREATE INDEX IF NOT EXISTS idx_requests_sender ON friend_requests(sender_id, status);
            "#,
        )?;

        Ok(())
    }

    // User and profile operations
    pub fn create_user(&self, username: &str, email: Option<&str>) -> Result<String> {
        let user_id = generate_user_id();
        let now = Utc::now();

        self.conn.execute(
            "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, email, now.to_rfc3339()],
        )?;
        self.conn.execute(
            "INSERT INTO profiles (id, username) VALUES (?1, ?2)",
            params![user_id, username],
        )?;

        Ok(user_id)
    }

    pub fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, skills_learnt, points, level, streak FROM profiles WHERE id = ?1",
        )?;

        let profile = stmt.query_row(params![user_id], Self::profile_from_row);
        match profile {
            Ok(p) => Ok(Some(p)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn get_profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, skills_learnt, points, level, streak FROM profiles WHERE username = ?1",
        )?;

        let profile = stmt.query_row(params![username], Self::profile_from_row);
        match profile {
            Ok(p) => Ok(Some(p)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn profile_from_row(row: &rusqlite::Row) -> Result<Profile> {
        Ok(Profile {
            id: row.get(0)?,
            username: row.get(1)?,
            skills_learnt: row.get(2)?,
            points: row.get(3)?,
            level: row.get(4)?,
            streak: row.get(5)?,
        })
    }

    pub fn rename_user(&self, user_id: &str, username: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE profiles SET username = ?1 WHERE id = ?2",
            params![username, user_id],
        )?;
        Ok(rows > 0)
    }

    // Derived aggregates are written only by the progress pipeline.
    pub fn update_derived(
        &self,
        user_id: &str,
        skills_learnt: i64,
        points: i64,
        level: i64,
        streak: i64,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE profiles
            SET skills_learnt = ?1, points = ?2, level = ?3, streak = ?4
            WHERE id = ?5
            "#,
            params![skills_learnt, points, level, streak, user_id],
        )?;
        Ok(())
    }

    // Category operations
    pub fn add_category(&self, title: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO categories (title) VALUES (?1)",
            params![title],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title FROM categories ORDER BY title")?;

        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                title: row.get(1)?,
            })
        })?;
        rows.collect()
    }

    // Skill operations
    pub fn add_skill(&self, title: &str, video_url: &str, category_id: i64) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO skills (title, video_url, category_id) VALUES (?1, ?2, ?3)",
            params![title, video_url, category_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_skill(&self, id: i64) -> Result<Option<Skill>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, video_url, category_id FROM skills WHERE id = ?1")?;

        let skill = stmt.query_row(params![id], Self::skill_from_row);
        match skill {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn list_skills(&self, category_id: Option<i64>) -> Result<Vec<Skill>> {
        let (query, params_vec): (&str, Vec<Box<dyn rusqlite::ToSql>>) =
            if let Some(cat) = category_id {
                (
                    "SELECT id, title, video_url, category_id FROM skills WHERE category_id = ?1 ORDER BY title",
                    vec![Box::new(cat)],
                )
            } else {
                (
                    "SELECT id, title, video_url, category_id FROM skills ORDER BY category_id, title",
                    vec![],
                )
            };

        let mut stmt = self.conn.prepare(query)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|b| b.as_ref()).collect();

        let rows = stmt.query_map(params_refs.as_slice(), Self::skill_from_row)?;
        rows.collect()
    }

    fn skill_from_row(row: &rusqlite::Row) -> Result<Skill> {
        Ok(Skill {
            id: row.get(0)?,
            title: row.get(1)?,
            video_url: row.get(2)?,
            category_id: row.get(3)?,
        })
    }

    // Quiz operations
    pub fn add_quiz_question(
        &self,
        skill_id: i64,
        question: &str,
        correct: &str,
        wrong: [&str; 3],
    ) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO quizzes (skill_id, question, correct_answer, wrong_answer_1, wrong_answer_2, wrong_answer_3)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![skill_id, question, correct, wrong[0], wrong[1], wrong[2]],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_quiz(&self, skill_id: i64) -> Result<Vec<QuizQuestion>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, skill_id, question, correct_answer, wrong_answer_1, wrong_answer_2, wrong_answer_3
            FROM quizzes
            WHERE skill_id = ?1
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map(params![skill_id], |row| {
            Ok(QuizQuestion {
                id: row.get(0)?,
                skill_id: row.get(1)?,
                question: row.get(2)?,
                correct_answer: row.get(3)?,
                wrong_answer_1: row.get(4)?,
                wrong_answer_2: row.get(5)?,
                wrong_answer_3: row.get(6)?,
            })
        })?;
        rows.collect()
    }

    // Completion operations

    // Returns true if a new row was written, false if the skill was already
    // recorded for this user. The duplicate is not an error: a retry or a
    // second device completing the same skill must converge on one state.
    pub fn record_completion(
        &self,
        user_id: &str,
        skill_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = self.conn.execute(
            "INSERT INTO users_learned_skills (user_id, skill_id, learned_at) VALUES (?1, ?2, ?3)",
            params![user_id, skill_id, now.to_rfc3339()],
        );

        match result {
            Ok(_) => Ok(true),
            // Only a duplicate of the (user_id, skill_id) key counts as
            // "already recorded"; other constraint failures are real errors.
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn list_completions(&self, user_id: &str) -> Result<Vec<LearnedSkill>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT uls.skill_id, s.title, c.title, uls.learned_at
            FROM users_learned_skills uls
            JOIN skills s ON uls.skill_id = s.id
            JOIN categories c ON s.category_id = c.id
            WHERE uls.user_id = ?1
            ORDER BY uls.learned_at DESC
            "#,
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(LearnedSkill {
                skill_id: row.get(0)?,
                skill_title: row.get(1)?,
                category_title: row.get(2)?,
                learned_at: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    pub fn learned_count(&self, user_id: &str) -> Result<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM users_learned_skills WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
    }

    // Random pick among skills the user has not learned and has not already
    // been shown this session. Candidates are fetched and the choice made
    // here, so the exclusion list needs no dynamic SQL.
    pub fn pick_mystery_skill(&self, user_id: &str, exclude: &[i64]) -> Result<Option<Skill>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, title, video_url, category_id
            FROM skills
            WHERE id NOT IN (SELECT skill_id FROM users_learned_skills WHERE user_id = ?1)
            "#,
        )?;

        let rows = stmt.query_map(params![user_id], Self::skill_from_row)?;
        let candidates: Vec<Skill> = rows
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .filter(|s| !exclude.contains(&s.id))
            .collect();

        Ok(candidates.choose(&mut rand::thread_rng()).cloned())
    }

    // Achievement operations
    pub fn unlocked_achievements(&self, user_id: &str) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT achievement_id FROM achievements_unlocked WHERE user_id = ?1 ORDER BY achievement_id",
        )?;

        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
        rows.collect()
    }

    // Idempotent for the same reason as record_completion.
    pub fn unlock_achievement(
        &self,
        user_id: &str,
        achievement_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = self.conn.execute(
            "INSERT INTO achievements_unlocked (user_id, achievement_id, unlocked_at) VALUES (?1, ?2, ?3)",
            params![user_id, achievement_id, now.to_rfc3339()],
        );

        match result {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    // Friend operations
    pub fn send_friend_request(&self, sender_id: &str, receiver_id: &str) -> Result<i64> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO friend_requests (sender_id, receiver_id, status, created_at) VALUES (?1, ?2, 'pending', ?3)",
            params![sender_id, receiver_id, now.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // Pending or accepted request in either direction; rejected requests do
    // not block a new attempt.
    pub fn request_exists_between(&self, a: &str, b: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM friend_requests
            WHERE status IN ('pending', 'accepted')
              AND ((sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1))
            "#,
            params![a, b],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn pending_requests(&self, receiver_id: &str) -> Result<Vec<FriendRequest>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT fr.id, fr.sender_id, p.username, fr.receiver_id, fr.status, fr.created_at
            FROM friend_requests fr
            JOIN profiles p ON fr.sender_id = p.id
            WHERE fr.receiver_id = ?1 AND fr.status = 'pending'
            ORDER BY fr.created_at ASC
            "#,
        )?;

        let rows = stmt.query_map(params![receiver_id], |row| {
            let status_str: String = row.get(4)?;
            Ok(FriendRequest {
                id: row.get(0)?,
                sender_id: row.get(1)?,
                sender_username: row.get(2)?,
                receiver_id: row.get(3)?,
                status: RequestStatus::from_str(&status_str).unwrap_or(RequestStatus::Pending),
                created_at: row.get(5)?,
            })
        })?;
        rows.collect()
    }

    pub fn respond_request(&self, request_id: i64, status: RequestStatus) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE friend_requests SET status = ?1 WHERE id = ?2 AND status = 'pending'",
            params![status.as_str(), request_id],
        )?;
        Ok(rows > 0)
    }

    pub fn list_friends(&self, user_id: &str) -> Result<Vec<FriendProfile>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, p.username, p.level, p.points
            FROM profiles p
            JOIN friend_requests fr
              ON (fr.sender_id = ?1 AND fr.receiver_id = p.id)
              OR (fr.receiver_id = ?1 AND fr.sender_id = p.id)
            WHERE fr.status = 'accepted'
            ORDER BY p.username
            "#,
        )?;

        let rows = stmt.query_map(params![user_id], Self::friend_from_row)?;
        rows.collect()
    }

    pub fn are_friends(&self, a: &str, b: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM friend_requests
            WHERE status = 'accepted'
              AND ((sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1))
            "#,
            params![a, b],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn search_profiles(&self, term: &str, exclude_user: &str) -> Result<Vec<FriendProfile>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, username, level, points
            FROM profiles
            WHERE username LIKE ?1 AND id != ?2
            ORDER BY username
            "#,
        )?;

        let pattern = format!("%{}%", term);
        let rows = stmt.query_map(params![pattern, exclude_user], Self::friend_from_row)?;
        rows.collect()
    }

    // Receivers this user already has a live request towards, used to
    // annotate search results.
    pub fn sent_request_receivers(&self, sender_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT receiver_id FROM friend_requests WHERE sender_id = ?1 AND status IN ('pending', 'accepted')",
        )?;

        let rows = stmt.query_map(params![sender_id], |row| row.get(0))?;
        rows.collect()
    }

    fn friend_from_row(row: &rusqlite::Row) -> Result<FriendProfile> {
        Ok(FriendProfile {
            id: row.get(0)?,
            username: row.get(1)?,
            level: row.get(2)?,
            points: row.get(3)?,
        })
    }

    pub fn get_stats(&self, user_id: &str) -> Result<Stats> {
        let total_categories: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;

        let total_skills: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM skills", [], |row| row.get(0))?;

        let skills_learnt = self.learned_count(user_id)?;

        let achievements: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM achievements_unlocked WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        let friends: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM friend_requests
            WHERE status = 'accepted' AND (sender_id = ?1 OR receiver_id = ?1)
            "#,
            params![user_id],
            |row| row.get(0),
        )?;

        Ok(Stats {
            total_categories,
            total_skills,
            skills_learnt,
            achievements,
            friends,
        })
    }
}

fn generate_user_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    format!("{:016x}{:016x}", rng.gen::<u64>(), rng.gen::<u64>())
}

#[derive(Debug, Clone)]
pub struct Stats {
    pub total_categories: i64,
    pub total_skills: i64,
    pub skills_learnt: i64,
    pub achievements: i64,
    pub friends: i64,
}
