use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

// Progression constants: each learned skill is worth 20 points, every 100
// points is a level. Fixed, not configurable.
pub const POINTS_PER_SKILL: i64 = 20;
pub const POINTS_PER_LEVEL: i64 = 100;

pub fn points_for(learned_count: i64) -> i64 {
    learned_count * POINTS_PER_SKILL
}

pub fn level_for(points: i64) -> i64 {
    points / POINTS_PER_LEVEL
}

// Points into the current level, e.g. shown as "XP" next to a friend's name.
pub fn level_progress(points: i64) -> i64 {
    points % POINTS_PER_LEVEL
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: i64,
    pub title: String,
    pub video_url: String,
    pub category_id: i64,
}

// A completion: the user passed this skill's quiz with a perfect score.
// learned_at is an RFC 3339 timestamp; immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedSkill {
    pub skill_id: i64,
    pub skill_title: String,
    pub category_title: String,
    pub learned_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub skills_learnt: i64,
    pub points: i64,
    pub level: i64,
    pub streak: i64,
}

// Four-option multiple choice question attached to a skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub skill_id: i64,
    pub question: String,
    pub correct_answer: String,
    pub wrong_answer_1: String,
    pub wrong_answer_2: String,
    pub wrong_answer_3: String,
}

impl QuizQuestion {
    pub fn options(&self) -> [&str; 4] {
        [
            &self.correct_answer,
            &self.wrong_answer_1,
            &self.wrong_answer_2,
            &self.wrong_answer_3,
        ]
    }

    // Presentation order only; grading compares against correct_answer.
    pub fn shuffled_options(&self) -> Vec<String> {
        let mut opts: Vec<String> = self.options().iter().map(|s| s.to_string()).collect();
        opts.shuffle(&mut rand::thread_rng());
        opts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionResult {
    pub question_id: i64,
    pub question: String,
    pub selected: Option<String>,
    pub correct: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizOutcome {
    pub correct_count: usize,
    pub results: Vec<QuestionResult>,
}

impl QuizOutcome {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    // A skill only counts as learned on a perfect score.
    pub fn all_correct(&self) -> bool {
        !self.results.is_empty() && self.correct_count == self.results.len()
    }
}

// Grade submitted answers against the question set. Answers align by index;
// a missing answer is simply incorrect. Never fails.
pub fn grade_quiz(questions: &[QuizQuestion], answers: &[Option<String>]) -> QuizOutcome {
    let results: Vec<QuestionResult> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let selected = answers.get(i).cloned().flatten();
            let is_correct = selected.as_deref() == Some(q.correct_answer.as_str());
            QuestionResult {
                question_id: q.id,
                question: q.question.clone(),
                selected,
                correct: q.correct_answer.clone(),
                is_correct,
            }
        })
        .collect();

    let correct_count = results.iter().filter(|r| r.is_correct).count();
    QuizOutcome {
        correct_count,
        results,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: i64,
    pub sender_id: String,
    pub sender_username: String,
    pub receiver_id: String,
    pub status: RequestStatus,
    pub created_at: String,
}

// Row shape for friend lists and user search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendProfile {
    pub id: String,
    pub username: String,
    pub level: i64,
    pub points: i64,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_question(id: i64, question: &str, correct: &str) -> QuizQuestion {
        QuizQuestion {
            id,
            skill_id: 1,
            question: question.to_string(),
            correct_answer: correct.to_string(),
            wrong_answer_1: "w1".to_string(),
            wrong_answer_2: "w2".to_string(),
            wrong_answer_3: "w3".to_string(),
        }
    }

    mod progression_tests {
        use super::*;

        #[test]
        fn points_scale_linearly() {
            assert_eq!(points_for(0), 0);
            assert_eq!(points_for(1), 20);
            assert_eq!(points_for(3), 60);
            assert_eq!(points_for(10), 200);
        }

        #[test]
        fn level_is_floor_of_points() {
            assert_eq!(level_for(0), 0);
            assert_eq!(level_for(60), 0);
            assert_eq!(level_for(99), 0);
            assert_eq!(level_for(100), 1);
            assert_eq!(level_for(199), 1);
            assert_eq!(level_for(200), 2);
        }

        #[test]
        fn level_progress_wraps_at_level_boundary() {
            assert_eq!(level_progress(0), 0);
            assert_eq!(level_progress(60), 60);
            assert_eq!(level_progress(100), 0);
            assert_eq!(level_progress(140), 40);
        }

        #[test]
        fn three_skills_is_sixty_points_level_zero() {
            let points = points_for(3);
            assert_eq!(points, 60);
            assert_eq!(level_for(points), 0);
        }
    }

    mod quiz_tests {
        use super::*;

        #[test]
        fn grade_empty_quiz() {
            let outcome = grade_quiz(&[], &[]);
            assert_eq!(outcome.correct_count, 0);
            assert_eq!(outcome.total(), 0);
            assert!(!outcome.all_correct());
        }

        #[test]
        fn grade_all_correct() {
            let questions = vec![make_question(1, "Q1", "a"), make_question(2, "Q2", "b")];
            let answers = vec![Some("a".to_string()), Some("b".to_string())];

            let outcome = grade_quiz(&questions, &answers);
            assert_eq!(outcome.correct_count, 2);
            assert!(outcome.all_correct());
            assert!(outcome.results.iter().all(|r| r.is_correct));
        }

        #[test]
        fn grade_partial_score() {
            let questions = vec![make_question(1, "Q1", "a"), make_question(2, "Q2", "b")];
            let answers = vec![Some("a".to_string()), Some("wrong".to_string())];

            let outcome = grade_quiz(&questions, &answers);
            assert_eq!(outcome.correct_count, 1);
            assert!(!outcome.all_correct());
            assert!(outcome.results[0].is_correct);
            assert!(!outcome.results[1].is_correct);
        }

        #[test]
        fn grade_missing_answer_is_incorrect() {
            let questions = vec![make_question(1, "Q1", "a"), make_question(2, "Q2", "b")];
            let answers = vec![Some("a".to_string())];

            let outcome = grade_quiz(&questions, &answers);
            assert_eq!(outcome.correct_count, 1);
            assert!(outcome.results[1].selected.is_none());
            assert!(!outcome.results[1].is_correct);
        }

        #[test]
        fn grade_none_answer_is_incorrect() {
            let questions = vec![make_question(1, "Q1", "a")];
            let answers = vec![None];

            let outcome = grade_quiz(&questions, &answers);
            assert_eq!(outcome.correct_count, 0);
        }

        #[test]
        fn result_records_selected_and_correct() {
            let questions = vec![make_question(7, "What is Rust?", "a language")];
            let answers = vec![Some("w1".to_string())];

            let outcome = grade_quiz(&questions, &answers);
            let r = &outcome.results[0];
            assert_eq!(r.question_id, 7);
            assert_eq!(r.question, "What is Rust?");
            assert_eq!(r.selected, Some("w1".to_string()));
            assert_eq!(r.correct, "a language");
        }

        #[test]
        fn shuffled_options_preserve_contents() {
            let q = make_question(1, "Q", "right");
            let opts = q.shuffled_options();
            assert_eq!(opts.len(), 4);
            for expected in ["right", "w1", "w2", "w3"] {
                assert!(opts.contains(&expected.to_string()));
            }
        }
    }

    mod request_status_tests {
        use super::*;

        #[test]
        fn as_str_round_trips() {
            for status in [
                RequestStatus::Pending,
                RequestStatus::Accepted,
                RequestStatus::Rejected,
            ] {
                assert_eq!(RequestStatus::from_str(status.as_str()), Some(status));
            }
        }

        #[test]
        fn from_str_case_insensitive() {
            assert_eq!(
                RequestStatus::from_str("PENDING"),
                Some(RequestStatus::Pending)
            );
        }

        #[test]
        fn from_str_invalid_returns_none() {
            assert!(RequestStatus::from_str("unknown").is_none());
            assert!(RequestStatus::from_str("").is_none());
        }
    }

    mod json_output_tests {
        use super::*;

        #[test]
        fn ok_wraps_data() {
            let output = JsonOutput::ok(42);
            assert!(output.success);
            assert_eq!(output.data, Some(42));
            assert!(output.error.is_none());
        }

        #[test]
        fn err_wraps_message() {
            let output = JsonOutput::<()>::err("nope");
            assert!(!output.success);
            assert!(output.data.is_none());
            assert_eq!(output.error, Some("nope".to_string()));
        }

        #[test]
        fn serializes_ok_correctly() {
            let output = JsonOutput::ok("test");
            let json = serde_json::to_string(&output).unwrap();
            assert!(json.contains("\"success\":true"));
            assert!(json.contains("\"data\":\"test\""));
        }
    }
}
