mod achievements;
mod db;
mod models;
mod mystery;
mod progress;
mod store;
mod streak;
mod tui;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use db::Database;
use models::{grade_quiz, JsonOutput, Profile, QuizOutcome, QuizQuestion};
use mystery::{CompleteResult, MysteryError, MysteryManager, MysteryStatus};
use store::Scratch;

const DEFAULT_DB_NAME: &str = "micromastery.db";

#[derive(Parser)]
#[command(name = "micromastery")]
#[command(about = "Micro-learning tracker: short skills, quiz gates, streaks and daily mystery challenges")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Create a new account
    Register {
        /// Username (must be unique)
        username: String,

        /// Email address
        #[arg(long, short)]
        email: Option<String>,
    },

    /// Log in as an existing user
    Login {
        /// Username
        username: String,
    },

    /// Log out the current user
    Logout,

    /// Manage categories
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Manage skills
    #[command(subcommand)]
    Skill(SkillCommands),

    /// Manage quiz questions
    #[command(subcommand)]
    Quiz(QuizCommands),

    /// Watch a skill and take its quiz
    Learn {
        /// Skill ID
        id: i64,
    },

    /// Daily mystery challenge
    #[command(subcommand)]
    Mystery(MysteryCommands),

    /// Show a profile (yours, or a friend's)
    Profile {
        /// Username of a friend
        #[arg(long, short)]
        user: Option<String>,
    },

    /// Manage friends
    #[command(subcommand)]
    Friends(FriendCommands),

    /// Show learning statistics
    Stats,

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// List all categories
    List,

    /// Add a new category
    Add {
        /// Category title
        title: String,
    },
}

#[derive(Subcommand)]
enum SkillCommands {
    /// List skills
    List {
        /// Filter by category ID
        #[arg(long, short)]
        category: Option<i64>,
    },

    /// Add a new skill
    Add {
        /// Skill title
        title: String,

        /// Video URL
        #[arg(long, short)]
        video_url: String,

        /// Category ID
        #[arg(long, short)]
        category: i64,
    },

    /// Show skill details
    Show {
        /// Skill ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum QuizCommands {
    /// Add a question to a skill's quiz
    Add {
        /// Skill ID
        skill_id: i64,

        /// Question text
        #[arg(long, short)]
        question: String,

        /// The correct answer
        #[arg(long, short)]
        correct: String,

        /// The three wrong answers
        #[arg(long, short, num_args = 3)]
        wrong: Vec<String>,
    },

    /// Show a skill's quiz questions
    Show {
        /// Skill ID
        skill_id: i64,
    },
}

#[derive(Subcommand)]
enum MysteryCommands {
    /// Show today's mystery challenge
    Show,

    /// Swap the assigned skill for a new one
    Refresh,

    /// Take the quiz for the assigned skill
    Take,
}

#[derive(Subcommand)]
enum FriendCommands {
    /// List accepted friends
    List,

    /// Search users by username
    Search {
        /// Substring to match
        term: String,
    },

    /// Send a friend request
    Request {
        /// Username to befriend
        username: String,
    },

    /// List incoming pending requests
    Requests,

    /// Accept a pending request
    Accept {
        /// Request ID
        id: i64,
    },

    /// Reject a pending request
    Reject {
        /// Request ID
        id: i64,
    },
}

fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("MICROMASTERY_DB") {
        return PathBuf::from(path);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("micromastery");

    std::fs::create_dir_all(&config_dir).ok();
    config_dir.join(DEFAULT_DB_NAME)
}

fn get_scratch_dir() -> PathBuf {
    if let Ok(path) = std::env::var("MICROMASTERY_SCRATCH") {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("micromastery")
        .join("scratch")
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(get_db_path())?;
    let scratch = Scratch::open(get_scratch_dir())?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Database initialized at: {}", get_db_path().display());
            }
        }

        Commands::Register { username, email } => {
            let user_id = db.create_user(&username, email.as_deref())?;
            scratch.set_current_user(&user_id)?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "id": user_id,
                        "username": username
                    })))?
                );
            } else {
                println!("Welcome, {}! You are now logged in.", username);
            }
        }

        Commands::Login { username } => {
            let Some(profile) = db.get_profile_by_username(&username)? else {
                return fail(cli.json, &format!("No user named '{}'", username));
            };
            scratch.set_current_user(&profile.id)?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&profile))?);
            } else {
                println!("Logged in as {}.", profile.username);
            }
        }

        Commands::Logout => {
            scratch.clear_current_user()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Logged out.");
            }
        }

        Commands::Category(cmd) => match cmd {
            CategoryCommands::List => {
                let categories = db.list_categories()?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&categories))?);
                } else if categories.is_empty() {
                    println!("No categories yet.");
                } else {
                    println!("{:<5} TITLE", "ID");
                    println!("{}", "-".repeat(40));
                    for cat in categories {
                        println!("{:<5} {}", cat.id, cat.title);
                    }
                }
            }

            CategoryCommands::Add { title } => {
                let id = db.add_category(&title)?;
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "id": id,
                            "title": title
                        })))?
                    );
                } else {
                    println!("Added category '{}' with ID: {}", title, id);
                }
            }
        },

        Commands::Skill(cmd) => match cmd {
            SkillCommands::List { category } => {
                let skills = db.list_skills(category)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&skills))?);
                } else if skills.is_empty() {
                    println!("No skills found.");
                } else {
                    println!("{:<5} {:<40} CATEGORY", "ID", "TITLE");
                    println!("{}", "-".repeat(60));
                    for skill in skills {
                        println!(
                            "{:<5} {:<40} {}",
                            skill.id,
                            truncate(&skill.title, 38),
                            skill.category_id
                        );
                    }
                }
            }

            SkillCommands::Add {
                title,
                video_url,
                category,
            } => {
                let id = db.add_skill(&title, &video_url, category)?;
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "id": id,
                            "title": title
                        })))?
                    );
                } else {
                    println!("Added skill '{}' with ID: {}", title, id);
                }
            }

            SkillCommands::Show { id } => {
                let Some(skill) = db.get_skill(id)? else {
                    return fail(cli.json, "Skill not found");
                };
                let questions = db.get_quiz(id)?;

                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "skill": skill,
                            "quiz_questions": questions.len()
                        })))?
                    );
                } else {
                    println!("Skill: {}", skill.title);
                    println!("ID: {}", skill.id);
                    println!("Watch: {}", skill.video_url);
                    println!("Quiz questions: {}", questions.len());
                }
            }
        },

        Commands::Quiz(cmd) => match cmd {
            QuizCommands::Add {
                skill_id,
                question,
                correct,
                wrong,
            } => {
                if db.get_skill(skill_id)?.is_none() {
                    return fail(cli.json, "Skill not found");
                }
                let id = db.add_quiz_question(
                    skill_id,
                    &question,
                    &correct,
                    [wrong[0].as_str(), wrong[1].as_str(), wrong[2].as_str()],
                )?;

                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({ "id": id })))?
                    );
                } else {
                    println!("Added question {} to skill {}.", id, skill_id);
                }
            }

            QuizCommands::Show { skill_id } => {
                let questions = db.get_quiz(skill_id)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&questions))?);
                } else if questions.is_empty() {
                    println!("No quiz available for this skill.");
                } else {
                    for (i, q) in questions.iter().enumerate() {
                        println!("{}. {}", i + 1, q.question);
                    }
                }
            }
        },

        Commands::Learn { id } => {
            let me = require_login(&db, &scratch)?;
            let Some(skill) = db.get_skill(id)? else {
                return fail(cli.json, "Skill not found");
            };

            let questions = db.get_quiz(id)?;
            if questions.is_empty() {
                return fail(cli.json, "No quiz available for this skill");
            }

            println!("=== {} ===", skill.title);
            println!("Watch: {}", skill.video_url);
            println!();
            println!("Full marks on the quiz mark this skill as learned.");
            println!();

            let outcome = run_quiz(&questions);
            print_quiz_results(&outcome);

            if outcome.all_correct() {
                let now = Utc::now();
                let inserted = db.record_completion(&me.id, skill.id, now)?;
                let report = progress::sync(&db, &me.id, now)?;
                print_progress(cli.json, inserted, &report)?;
            } else if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "passed": false,
                        "correct": outcome.correct_count,
                        "total": outcome.total()
                    })))?
                );
            } else {
                println!(
                    "You scored {} out of {}. Full marks are required; try again with 'micromastery learn {}'.",
                    outcome.correct_count,
                    outcome.total(),
                    skill.id
                );
            }
        }

        Commands::Mystery(cmd) => {
            let me = require_login(&db, &scratch)?;
            let manager = MysteryManager::new(&db, &scratch, &me.id);
            let now = Utc::now();

            match cmd {
                MysteryCommands::Show => {
                    let status = manager.open(now)?;
                    print_mystery_status(cli.json, &status, now)?;
                }

                MysteryCommands::Refresh => match manager.refresh(now) {
                    Ok(status) => print_mystery_status(cli.json, &status, now)?,
                    Err(MysteryError::RefreshLimitReached) => {
                        let msg = "You've reached the maximum refresh limit for today";
                        if cli.json {
                            println!("{}", serde_json::to_string(&JsonOutput::<()>::err(msg))?);
                        } else {
                            println!("{}.", msg);
                        }
                    }
                    Err(e) => return Err(e.into()),
                },

                MysteryCommands::Take => {
                    let skill = match manager.open(now)? {
                        MysteryStatus::Active { skill, .. } => skill,
                        other => {
                            print_mystery_status(cli.json, &other, now)?;
                            return Ok(());
                        }
                    };

                    let questions = db.get_quiz(skill.id)?;
                    if questions.is_empty() {
                        return fail(cli.json, "No quiz available for this skill");
                    }

                    println!("=== Mystery skill: {} ===", skill.title);
                    println!("Watch: {}", skill.video_url);
                    println!();

                    let outcome = run_quiz(&questions);
                    print_quiz_results(&outcome);

                    match manager.complete(&outcome, Utc::now())? {
                        CompleteResult::Passed {
                            report,
                            cooldown_until,
                        } => {
                            print_progress(cli.json, true, &report)?;
                            if !cli.json {
                                println!(
                                    "You've completed today's mystery challenge! Next challenge in {}.",
                                    format_countdown(cooldown_until, Utc::now())
                                );
                            }
                        }
                        CompleteResult::TryAgain { correct, total } => {
                            if cli.json {
                                println!(
                                    "{}",
                                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                                        "passed": false,
                                        "correct": correct,
                                        "total": total
                                    })))?
                                );
                            } else {
                                println!(
                                    "You scored {} out of {}. Retry with 'micromastery mystery take'.",
                                    correct, total
                                );
                            }
                        }
                    }
                }
            }
        }

        Commands::Profile { user } => {
            let me = require_login(&db, &scratch)?;

            let profile = match user {
                None => {
                    // Own profile: refresh derived values before showing them
                    progress::sync(&db, &me.id, Utc::now())?.profile
                }
                Some(username) => {
                    let Some(other) = db.get_profile_by_username(&username)? else {
                        return fail(cli.json, &format!("No user named '{}'", username));
                    };
                    if other.id != me.id && !db.are_friends(&me.id, &other.id)? {
                        return fail(cli.json, "You can only view profiles of accepted friends");
                    }
                    other
                }
            };

            let learned = db.list_completions(&profile.id)?;
            let unlocked = db.unlocked_achievements(&profile.id)?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "profile": profile,
                        "learned": learned,
                        "achievements": unlocked
                    })))?
                );
            } else {
                println!("@{}", profile.username);
                println!(
                    "Level {} - {} XP - {}-day streak",
                    profile.level,
                    profile.points,
                    profile.streak
                );
                println!();

                println!("--- Achievements ---");
                if unlocked.is_empty() {
                    println!("No achievements yet.");
                } else {
                    for id in &unlocked {
                        if let Some(a) = achievements::find(*id) {
                            println!("{}: {}", a.title, a.description);
                        }
                    }
                }
                println!();

                println!("--- Learned Skills ---");
                if learned.is_empty() {
                    println!("No skills learnt yet...we all start somewhere!");
                } else {
                    for s in &learned {
                        println!(
                            "{:<40} {:<20} {}",
                            truncate(&s.skill_title, 38),
                            truncate(&s.category_title, 18),
                            format_date(&s.learned_at)
                        );
                    }
                }
            }
        }

        Commands::Friends(cmd) => {
            let me = require_login(&db, &scratch)?;

            match cmd {
                FriendCommands::List => {
                    let friends = db.list_friends(&me.id)?;
                    if cli.json {
                        println!("{}", serde_json::to_string(&JsonOutput::ok(&friends))?);
                    } else if friends.is_empty() {
                        println!("You have no friends yet.");
                    } else {
                        println!("{:<20} {:<8} XP", "USERNAME", "LEVEL");
                        println!("{}", "-".repeat(40));
                        for f in friends {
                            println!(
                                "{:<20} {:<8} {}",
                                truncate(&f.username, 18),
                                f.level,
                                models::level_progress(f.points)
                            );
                        }
                    }
                }

                FriendCommands::Search { term } => {
                    let hits = db.search_profiles(&term, &me.id)?;
                    let requested = db.sent_request_receivers(&me.id)?;

                    if cli.json {
                        println!("{}", serde_json::to_string(&JsonOutput::ok(&hits))?);
                    } else if hits.is_empty() {
                        println!("No users match '{}'.", term);
                    } else {
                        for hit in hits {
                            let marker = if requested.contains(&hit.id) {
                                " (requested)"
                            } else {
                                ""
                            };
                            println!("{}{}", hit.username, marker);
                        }
                    }
                }

                FriendCommands::Request { username } => {
                    let Some(other) = db.get_profile_by_username(&username)? else {
                        return fail(cli.json, &format!("No user named '{}'", username));
                    };
                    if other.id == me.id {
                        return fail(cli.json, "You can't befriend yourself");
                    }
                    if db.request_exists_between(&me.id, &other.id)? {
                        return fail(cli.json, "A request between you already exists");
                    }

                    let id = db.send_friend_request(&me.id, &other.id)?;
                    if cli.json {
                        println!(
                            "{}",
                            serde_json::to_string(&JsonOutput::ok(serde_json::json!({ "id": id })))?
                        );
                    } else {
                        println!("Friend request sent to {}.", other.username);
                    }
                }

                FriendCommands::Requests => {
                    let pending = db.pending_requests(&me.id)?;
                    if cli.json {
                        println!("{}", serde_json::to_string(&JsonOutput::ok(&pending))?);
                    } else if pending.is_empty() {
                        println!("No friend requests at the moment.");
                    } else {
                        println!("{:<5} FROM", "ID");
                        println!("{}", "-".repeat(30));
                        for req in pending {
                            println!("{:<5} {}", req.id, req.sender_username);
                        }
                    }
                }

                FriendCommands::Accept { id } => {
                    respond_to_request(&db, &me.id, id, true, cli.json)?;
                }

                FriendCommands::Reject { id } => {
                    respond_to_request(&db, &me.id, id, false, cli.json)?;
                }
            }
        }

        Commands::Stats => {
            let me = require_login(&db, &scratch)?;
            let profile = progress::sync(&db, &me.id, Utc::now())?.profile;
            let stats = db.get_stats(&me.id)?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "categories": stats.total_categories,
                        "skills": stats.total_skills,
                        "skills_learnt": stats.skills_learnt,
                        "points": profile.points,
                        "level": profile.level,
                        "streak": profile.streak,
                        "achievements": stats.achievements,
                        "friends": stats.friends
                    })))?
                );
            } else {
                println!("=== Learning Statistics ===");
                println!("Categories: {}", stats.total_categories);
                println!("Skills available: {}", stats.total_skills);
                println!("Skills learnt: {}", stats.skills_learnt);
                println!("Points: {}", profile.points);
                println!("Level: {}", profile.level);
                println!("Current streak: {} days", profile.streak);
                println!("Achievements unlocked: {}", stats.achievements);
                println!("Friends: {}", stats.friends);
            }
        }

        Commands::Tui => {
            let me = require_login(&db, &scratch)?;
            tui::run(db, scratch, me)?;
        }
    }

    Ok(())
}

// Only the receiver of a still-pending request may answer it.
fn respond_to_request(
    db: &Database,
    me: &str,
    request_id: i64,
    accepting: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pending = db.pending_requests(me)?;
    if !pending.iter().any(|r| r.id == request_id) {
        return fail(json, "No such pending request");
    }

    let status = if accepting {
        models::RequestStatus::Accepted
    } else {
        models::RequestStatus::Rejected
    };
    db.respond_request(request_id, status)?;

    if json {
        println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
    } else if accepting {
        println!("Request accepted.");
    } else {
        println!("Request rejected.");
    }
    Ok(())
}

fn require_login(
    db: &Database,
    scratch: &Scratch,
) -> Result<Profile, Box<dyn std::error::Error>> {
    let Some(user_id) = scratch.current_user()? else {
        return Err("Not logged in. Run 'micromastery login <username>' first".into());
    };
    match db.get_profile(&user_id)? {
        Some(profile) => Ok(profile),
        // Stale session pointing at a deleted account
        None => Err("Your session is stale; log in again".into()),
    }
}

// Uniform user-visible rejection: message on stdout, no state changed,
// process still exits 0 (these are expected outcomes, not faults).
fn fail(json: bool, msg: &str) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(&JsonOutput::<()>::err(msg))?);
    } else {
        println!("{}.", msg);
    }
    Ok(())
}

// Interactive quiz on stdin. Options are shuffled per question; an empty or
// invalid line counts as no answer.
fn run_quiz(questions: &[QuizQuestion]) -> QuizOutcome {
    let mut answers: Vec<Option<String>> = Vec::with_capacity(questions.len());

    for (i, q) in questions.iter().enumerate() {
        println!("{}. {}", i + 1, q.question);
        let options = q.shuffled_options();
        for (j, opt) in options.iter().enumerate() {
            println!("   {}) {}", j + 1, opt);
        }

        let choice = prompt_choice(options.len());
        answers.push(choice.map(|n| options[n - 1].clone()));
        println!();
    }

    grade_quiz(questions, &answers)
}

fn prompt_choice(total: usize) -> Option<usize> {
    print!("Your answer [1-{}]: ", total);
    std::io::stdout().flush().ok();

    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return None;
    }
    line.trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=total).contains(n))
}

fn print_quiz_results(outcome: &QuizOutcome) {
    println!("=== Quiz completed ===");
    println!(
        "You scored {} out of {}.",
        outcome.correct_count,
        outcome.total()
    );
    for r in &outcome.results {
        let mark = if r.is_correct { "correct" } else { "incorrect" };
        println!("  [{}] {}", mark, r.question);
    }
    println!();
}

fn print_progress(
    json: bool,
    inserted: bool,
    report: &progress::ProgressReport,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!(
            "{}",
            serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                "passed": true,
                "already_recorded": !inserted,
                "profile": &report.profile,
                "new_achievements": &report.newly_unlocked
            })))?
        );
        return Ok(());
    }

    if inserted {
        println!("Skill learned!");
    } else {
        println!("Skill was already recorded; your progress is unchanged.");
    }
    println!(
        "Skills: {}  Points: {}  Level: {}  Streak: {} days",
        report.profile.skills_learnt,
        report.profile.points,
        report.profile.level,
        report.profile.streak
    );
    for id in &report.newly_unlocked {
        if let Some(a) = achievements::find(*id) {
            println!("Achievement unlocked: {} ({})", a.title, a.description);
        }
    }
    for (id, err) in &report.unlock_failures {
        eprintln!("Failed to record achievement {}: {}", id, err);
    }
    Ok(())
}

fn print_mystery_status(
    json: bool,
    status: &MysteryStatus,
    now: DateTime<Utc>,
) -> Result<(), Box<dyn std::error::Error>> {
    match status {
        MysteryStatus::Active {
            skill,
            refreshes_left,
        } => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "state": "active",
                        "skill": skill,
                        "refreshes_left": refreshes_left
                    })))?
                );
            } else {
                println!("=== Mystery skill: {} ===", skill.title);
                println!("Watch: {}", skill.video_url);
                println!("Refreshes left today: {}", refreshes_left);
                println!("When you're ready: 'micromastery mystery take'");
            }
        }

        MysteryStatus::Cooldown { until } => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "state": "cooldown",
                        "until": until.to_rfc3339()
                    })))?
                );
            } else {
                println!("You've completed today's mystery challenge!");
                println!(
                    "Next challenge available in: {}",
                    format_countdown(*until, now)
                );
            }
        }

        MysteryStatus::Exhausted => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "state": "exhausted"
                    })))?
                );
            } else {
                println!("No more mystery skills available. Please try again tomorrow.");
            }
        }
    }
    Ok(())
}

fn format_countdown(until: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = (until - now).num_seconds().max(0);
    let h = remaining / 3600;
    let m = (remaining % 3600) / 60;
    let s = remaining % 60;
    format!("{}h {}m {}s", h, m, s)
}

fn format_date(timestamp: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        dt.format("%b %d, %Y").to_string()
    } else {
        timestamp.chars().take(10).collect()
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    mod truncate_tests {
        use super::*;

        #[test]
        fn truncate_short_string() {
            assert_eq!(truncate("hello", 10), "hello");
        }

        #[test]
        fn truncate_exact_length() {
            assert_eq!(truncate("hello", 5), "hello");
        }

        #[test]
        fn truncate_long_string() {
            assert_eq!(truncate("hello world", 8), "hello...");
        }

        #[test]
        fn truncate_empty_string() {
            assert_eq!(truncate("", 10), "");
        }
    }

    mod countdown_tests {
        use super::*;
        use chrono::Duration;

        #[test]
        fn formats_hours_minutes_seconds() {
            let now = Utc::now();
            let until = now + Duration::hours(23) + Duration::minutes(59) + Duration::seconds(5);
            assert_eq!(format_countdown(until, now), "23h 59m 5s");
        }

        #[test]
        fn elapsed_deadline_clamps_to_zero() {
            let now = Utc::now();
            let until = now - Duration::minutes(5);
            assert_eq!(format_countdown(until, now), "0h 0m 0s");
        }
    }

    mod cli_parsing_tests {
        use super::*;

        #[test]
        fn parse_init_command() {
            let cli = Cli::try_parse_from(["micromastery", "init"]).unwrap();
            assert!(!cli.json);
            assert!(matches!(cli.command, Commands::Init));
        }

        #[test]
        fn parse_register_with_email() {
            let cli = Cli::try_parse_from([
                "micromastery",
                "register",
                "alice",
                "--email",
                "alice@example.com",
            ])
            .unwrap();
            match cli.command {
                Commands::Register { username, email } => {
                    assert_eq!(username, "alice");
                    assert_eq!(email, Some("alice@example.com".to_string()));
                }
                _ => panic!("Expected Register command"),
            }
        }

        #[test]
        fn parse_login() {
            let cli = Cli::try_parse_from(["micromastery", "login", "alice"]).unwrap();
            match cli.command {
                Commands::Login { username } => assert_eq!(username, "alice"),
                _ => panic!("Expected Login command"),
            }
        }

        #[test]
        fn parse_skill_add() {
            let cli = Cli::try_parse_from([
                "micromastery",
                "skill",
                "add",
                "Knife basics",
                "--video-url",
                "https://example.com/v",
                "--category",
                "3",
            ])
            .unwrap();
            match cli.command {
                Commands::Skill(SkillCommands::Add {
                    title,
                    video_url,
                    category,
                }) => {
                    assert_eq!(title, "Knife basics");
                    assert_eq!(video_url, "https://example.com/v");
                    assert_eq!(category, 3);
                }
                _ => panic!("Expected Skill Add command"),
            }
        }

        #[test]
        fn parse_skill_list_with_category() {
            let cli =
                Cli::try_parse_from(["micromastery", "skill", "list", "--category", "2"]).unwrap();
            match cli.command {
                Commands::Skill(SkillCommands::List { category }) => {
                    assert_eq!(category, Some(2));
                }
                _ => panic!("Expected Skill List command"),
            }
        }

        #[test]
        fn parse_quiz_add_requires_three_wrong_answers() {
            let cli = Cli::try_parse_from([
                "micromastery",
                "quiz",
                "add",
                "5",
                "--question",
                "Q?",
                "--correct",
                "yes",
                "--wrong",
                "no",
                "maybe",
                "never",
            ])
            .unwrap();
            match cli.command {
                Commands::Quiz(QuizCommands::Add {
                    skill_id, wrong, ..
                }) => {
                    assert_eq!(skill_id, 5);
                    assert_eq!(wrong.len(), 3);
                }
                _ => panic!("Expected Quiz Add command"),
            }

            let too_few = Cli::try_parse_from([
                "micromastery",
                "quiz",
                "add",
                "5",
                "--question",
                "Q?",
                "--correct",
                "yes",
                "--wrong",
                "no",
                "maybe",
            ]);
            assert!(too_few.is_err());
        }

        #[test]
        fn parse_learn() {
            let cli = Cli::try_parse_from(["micromastery", "learn", "7"]).unwrap();
            match cli.command {
                Commands::Learn { id } => assert_eq!(id, 7),
                _ => panic!("Expected Learn command"),
            }
        }

        #[test]
        fn parse_mystery_subcommands() {
            let show = Cli::try_parse_from(["micromastery", "mystery", "show"]).unwrap();
            assert!(matches!(
                show.command,
                Commands::Mystery(MysteryCommands::Show)
            ));

            let refresh = Cli::try_parse_from(["micromastery", "mystery", "refresh"]).unwrap();
            assert!(matches!(
                refresh.command,
                Commands::Mystery(MysteryCommands::Refresh)
            ));

            let take = Cli::try_parse_from(["micromastery", "mystery", "take"]).unwrap();
            assert!(matches!(
                take.command,
                Commands::Mystery(MysteryCommands::Take)
            ));
        }

        #[test]
        fn parse_profile_with_user() {
            let cli =
                Cli::try_parse_from(["micromastery", "profile", "--user", "bob"]).unwrap();
            match cli.command {
                Commands::Profile { user } => assert_eq!(user, Some("bob".to_string())),
                _ => panic!("Expected Profile command"),
            }
        }

        #[test]
        fn parse_friends_subcommands() {
            let cli =
                Cli::try_parse_from(["micromastery", "friends", "request", "bob"]).unwrap();
            match cli.command {
                Commands::Friends(FriendCommands::Request { username }) => {
                    assert_eq!(username, "bob")
                }
                _ => panic!("Expected Friends Request command"),
            }

            let cli = Cli::try_parse_from(["micromastery", "friends", "accept", "3"]).unwrap();
            assert!(matches!(
                cli.command,
                Commands::Friends(FriendCommands::Accept { id: 3 })
            ));
        }

        #[test]
        fn parse_json_flag_global() {
            let cli = Cli::try_parse_from(["micromastery", "--json", "stats"]).unwrap();
            assert!(cli.json);

            let cli = Cli::try_parse_from(["micromastery", "stats", "--json"]).unwrap();
            assert!(cli.json);
        }

        #[test]
        fn parse_invalid_command_fails() {
            assert!(Cli::try_parse_from(["micromastery", "invalid"]).is_err());
        }

        #[test]
        fn parse_missing_required_arg_fails() {
            assert!(Cli::try_parse_from(["micromastery", "login"]).is_err());
            assert!(Cli::try_parse_from(["micromastery", "learn"]).is_err());
            assert!(Cli::try_parse_from(["micromastery", "friends", "accept"]).is_err());
        }
    }

    mod path_tests {
        use super::*;
        use std::env;

        #[test]
        fn get_db_path_uses_env_var() {
            let test_path = "/tmp/test_micromastery.db";
            env::set_var("MICROMASTERY_DB", test_path);

            let path = get_db_path();
            assert_eq!(path.to_str().unwrap(), test_path);

            env::remove_var("MICROMASTERY_DB");
        }

        #[test]
        fn get_scratch_dir_uses_env_var() {
            let test_path = "/tmp/test_micromastery_scratch";
            env::set_var("MICROMASTERY_SCRATCH", test_path);

            let path = get_scratch_dir();
            assert_eq!(path.to_str().unwrap(), test_path);

            env::remove_var("MICROMASTERY_SCRATCH");
        }
    }
}
