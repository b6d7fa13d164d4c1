mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use chrono::Utc;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::db::{Database, Stats};
use crate::models::{Category, FriendProfile, FriendRequest, LearnedSkill, Profile, Skill};
use crate::mystery::{MysteryManager, MysteryStatus};
use crate::progress;
use crate::store::Scratch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Skills,
    SkillDetail,
    Mystery,
    Friends,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Skills,
            View::Skills => View::Mystery,
            View::SkillDetail => View::Skills,
            View::Mystery => View::Friends,
            View::Friends => View::Dashboard,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Friends,
            View::Skills => View::Dashboard,
            View::SkillDetail => View::Skills,
            View::Mystery => View::Skills,
            View::Friends => View::Mystery,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) => {
                if i >= self.items.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) => {
                if i == 0 {
                    self.items.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.selected = Some(i);
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

pub struct App {
    db: Database,
    scratch: Scratch,
    pub profile: Profile,
    pub view: View,
    pub skills: StatefulList<Skill>,
    pub categories: Vec<Category>,
    pub selected_skill: Option<Skill>,
    pub selected_skill_questions: usize,
    pub learned: Vec<LearnedSkill>,
    pub unlocked: Vec<i64>,
    pub friends: Vec<FriendProfile>,
    pub pending: Vec<FriendRequest>,
    pub mystery: Option<MysteryStatus>,
    pub mystery_notice: Option<String>,
    pub stats: Stats,
    pub filter_text: Option<String>,
    pub filter_input: String,
    pub filter_mode: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        db: Database,
        scratch: Scratch,
        user: Profile,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        // Derived values are refreshed once on entry so the dashboard does
        // not show stale aggregates.
        let profile = progress::sync(&db, &user.id, Utc::now())?.profile;

        let skills = db.list_skills(None)?;
        let categories = db.list_categories()?;
        let learned = db.list_completions(&profile.id)?;
        let unlocked = db.unlocked_achievements(&profile.id)?;
        let friends = db.list_friends(&profile.id)?;
        let pending = db.pending_requests(&profile.id)?;
        let stats = db.get_stats(&profile.id)?;
        let mystery = MysteryManager::new(&db, &scratch, &profile.id).open(Utc::now())?;

        Ok(Self {
            db,
            scratch,
            profile,
            view: View::Dashboard,
            skills: StatefulList::with_items(skills),
            categories,
            selected_skill: None,
            selected_skill_questions: 0,
            learned,
            unlocked,
            friends,
            pending,
            mystery: Some(mystery),
            mystery_notice: None,
            stats,
            filter_text: None,
            filter_input: String::new(),
            filter_mode: false,
            should_quit: false,
        })
    }

    pub fn category_title(&self, category_id: i64) -> &str {
        self.categories
            .iter()
            .find(|c| c.id == category_id)
            .map(|c| c.title.as_str())
            .unwrap_or("?")
    }

    pub fn is_learned(&self, skill_id: i64) -> bool {
        self.learned.iter().any(|l| l.skill_id == skill_id)
    }

    pub fn refresh_data(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.profile = progress::sync(&self.db, &self.profile.id, Utc::now())?.profile;
        self.apply_filter()?;
        self.categories = self.db.list_categories()?;
        self.learned = self.db.list_completions(&self.profile.id)?;
        self.unlocked = self.db.unlocked_achievements(&self.profile.id)?;
        self.friends = self.db.list_friends(&self.profile.id)?;
        self.pending = self.db.pending_requests(&self.profile.id)?;
        self.stats = self.db.get_stats(&self.profile.id)?;
        self.mystery = Some(
            MysteryManager::new(&self.db, &self.scratch, &self.profile.id).open(Utc::now())?,
        );
        Ok(())
    }

    fn apply_filter(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let all = self.db.list_skills(None)?;
        let items = match &self.filter_text {
            None => all,
            Some(needle) => {
                let needle = needle.to_lowercase();
                all.into_iter()
                    .filter(|s| s.title.to_lowercase().contains(&needle))
                    .collect()
            }
        };
        self.skills = StatefulList::with_items(items);
        Ok(())
    }

    fn select_skill(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(skill) = self.skills.selected_item() {
            self.selected_skill = Some(skill.clone());
            self.selected_skill_questions = self.db.get_quiz(skill.id)?.len();
            self.view = View::SkillDetail;
        }
        Ok(())
    }

    // 'r' on the mystery view: draw a replacement skill, or surface the
    // limit notice without touching the session.
    fn refresh_mystery(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let manager = MysteryManager::new(&self.db, &self.scratch, &self.profile.id);
        match manager.refresh(Utc::now()) {
            Ok(status) => {
                self.mystery = Some(status);
                self.mystery_notice = None;
            }
            Err(crate::mystery::MysteryError::RefreshLimitReached) => {
                self.mystery_notice =
                    Some("Refresh limit reached for today's session".to_string());
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn handle_key(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
    ) -> Result<(), Box<dyn std::error::Error>> {
        // Handle filter mode input (vim-like / search)
        if self.filter_mode {
            match key {
                KeyCode::Esc => {
                    self.filter_mode = false;
                    self.filter_input.clear();
                }
                KeyCode::Enter => {
                    self.filter_mode = false;
                    self.filter_text = if self.filter_input.is_empty() {
                        None
                    } else {
                        Some(self.filter_input.clone())
                    };
                    self.apply_filter()?;
                }
                KeyCode::Backspace => {
                    self.filter_input.pop();
                }
                KeyCode::Char(c) => {
                    self.filter_input.push(c);
                }
                _ => {}
            }
            return Ok(());
        }

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
            }

            KeyCode::Char('r') if self.view == View::Mystery => {
                self.refresh_mystery()?;
            }

            KeyCode::Char('/') if self.view == View::Skills => {
                self.filter_mode = true;
                self.filter_input.clear();
            }

            KeyCode::Esc => match self.view {
                View::SkillDetail => {
                    self.view = View::Skills;
                    self.selected_skill = None;
                }
                View::Skills if self.filter_text.is_some() => {
                    self.filter_text = None;
                    self.filter_input.clear();
                    self.apply_filter()?;
                }
                _ => {}
            },

            KeyCode::Char('h') | KeyCode::Left => match self.view {
                View::SkillDetail => {
                    self.view = View::Skills;
                    self.selected_skill = None;
                }
                _ => self.view = self.view.prev(),
            },
            KeyCode::Char('l') | KeyCode::Right => match self.view {
                View::Skills => self.select_skill()?,
                _ => self.view = self.view.next(),
            },

            KeyCode::Tab => {
                if modifiers.contains(KeyModifiers::SHIFT) {
                    self.view = self.view.prev();
                } else {
                    self.view = self.view.next();
                }
            }
            KeyCode::BackTab => {
                self.view = self.view.prev();
            }

            KeyCode::Char('j') | KeyCode::Down => {
                if self.view == View::Skills {
                    self.skills.next();
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if self.view == View::Skills {
                    self.skills.previous();
                }
            }

            KeyCode::Char('g') => {
                if self.view == View::Skills && !self.skills.items.is_empty() {
                    self.skills.selected = Some(0);
                }
            }
            KeyCode::Char('G') => {
                if self.view == View::Skills && !self.skills.items.is_empty() {
                    self.skills.selected = Some(self.skills.items.len() - 1);
                }
            }

            KeyCode::Enter => {
                if self.view == View::Skills {
                    self.select_skill()?;
                }
            }

            _ => {}
        }
        Ok(())
    }
}

pub fn run(
    db: Database,
    scratch: Scratch,
    user: Profile,
) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new(db, scratch, user)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
