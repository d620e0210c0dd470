//! TUI module - live workout screen with ratatui

use std::io::{Stdout, Write, stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};
use tracing::warn;

use crate::app::App;
use crate::db::StateStore;
use crate::model::{REST_PRESETS, UserProfile, format_clock};
use crate::session::{SessionTracker, SetEdit};
use crate::timer::{CancelToken, RestState, Ticker};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// How long the "rest over" banner stays up
const REST_FLASH: Duration = Duration::from_secs(2);
/// Elapsed time is saved every this many ticks
const SAVE_EVERY_TICKS: u32 = 10;
/// Terminal bell, the closest a terminal gets to a vibration
const BELL: &[u8] = b"\x07";

/// Whether the end of a rest should ring the bell
fn rest_alert(profile: Option<&UserProfile>) -> bool {
    profile.is_some_and(|p| p.haptics_enabled)
}

/// Live session screen over the active workout
pub struct SessionScreen<'a, S: StateStore> {
    app: &'a mut App<S>,
    tracker: SessionTracker,
    ticker: Ticker,
    /// Index into the flattened (exercise, set) list
    cursor: usize,
    flash_until: Option<Instant>,
    status: String,
    unsaved_ticks: u32,
    /// Workout moved to history; nothing left to save
    finished: bool,
    should_quit: bool,
}

impl<'a, S: StateStore> SessionScreen<'a, S> {
    /// Must be created inside a tokio runtime (spawns the 1 Hz ticker)
    pub fn new(app: &'a mut App<S>) -> Result<Self> {
        let tracker = app.tracker()?;
        let ticker = Ticker::every_second(CancelToken::new());
        let mut screen = Self {
            app,
            tracker,
            ticker,
            cursor: 0,
            flash_until: None,
            status: String::new(),
            unsaved_ticks: 0,
            finished: false,
            should_quit: false,
        };
        screen.jump_to_focus();
        Ok(screen)
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = init_terminal()?;

        while !self.should_quit {
            self.on_ticks();
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
        }

        restore_terminal()?;
        self.ticker.token().cancel();
        if !self.finished {
            self.app.commit_tracker(&self.tracker)?;
        }
        Ok(())
    }

    fn slots(&self) -> Vec<(usize, usize)> {
        self.tracker
            .session()
            .exercises
            .iter()
            .enumerate()
            .flat_map(|(e, ex)| (0..ex.sets.len()).map(move |s| (e, s)))
            .collect()
    }

    fn jump_to_focus(&mut self) {
        let Some(focus) = self.tracker.focused() else { return };
        let Some(ex_idx) = self.tracker.session().exercises.iter().position(|e| e.id == focus) else {
            return;
        };
        let exercise = &self.tracker.session().exercises[ex_idx];
        let set_idx = exercise.sets.iter().position(|s| !s.completed).unwrap_or(0);
        if let Some(pos) = self.slots().iter().position(|&slot| slot == (ex_idx, set_idx)) {
            self.cursor = pos;
        }
    }

    fn on_ticks(&mut self) {
        for _ in 0..self.ticker.drain() {
            match self.tracker.tick() {
                Ok(Some(_)) => self.rest_over(),
                Ok(None) => {}
                Err(e) => self.status = e.to_string(),
            }
            self.unsaved_ticks += 1;
        }
        if self.unsaved_ticks >= SAVE_EVERY_TICKS {
            self.unsaved_ticks = 0;
            if let Err(e) = self.app.commit_tracker(&self.tracker) {
                warn!(error = %e, "periodic save failed");
                self.status = e.to_string();
            }
        }
    }

    fn rest_over(&mut self) {
        self.flash_until = Some(Instant::now() + REST_FLASH);
        if rest_alert(self.app.profile().ok()) {
            let mut out = stdout();
            if let Err(e) = out.write_all(BELL).and_then(|()| out.flush()) {
                warn!(error = %e, "bell failed");
            }
        }
    }

    fn selected(&self) -> Option<(String, usize)> {
        let (e, s) = *self.slots().get(self.cursor)?;
        Some((self.tracker.session().exercises[e].id.clone(), s))
    }

    /// Save after a user action and show the outcome
    fn persist(&mut self, message: impl Into<String>) {
        self.status = match self.app.commit_tracker(&self.tracker) {
            Ok(()) => message.into(),
            Err(e) => e.to_string(),
        };
    }

    fn toggle_selected(&mut self) {
        let Some((id, set)) = self.selected() else { return };
        match self.tracker.toggle_set_completion(&id, set) {
            Ok(outcome) => {
                if outcome.rest_signal.is_some() {
                    self.rest_over();
                }
                if outcome.completed {
                    self.jump_to_focus();
                }
                self.persist(if outcome.completed { "Seria zaliczona" } else { "Seria cofnięta" });
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    fn adjust_selected(&mut self, weight_delta: f64, reps_delta: i32) {
        let Some((id, set_idx)) = self.selected() else { return };
        let Some(exercise) = self.tracker.session().exercise(&id) else { return };
        let set = &exercise.sets[set_idx];

        let edit = if exercise.is_timed {
            let minutes = set.duration_minutes.unwrap_or(0) as i32 + reps_delta;
            SetEdit { duration_minutes: Some(minutes.clamp(0, 120) as u32), ..Default::default() }
        } else {
            let weight = (set.weight.unwrap_or(0.0) + weight_delta).clamp(0.0, 250.0);
            let reps = (set.reps.unwrap_or(0) as i32 + reps_delta).clamp(0, 50) as u32;
            SetEdit {
                weight: (!exercise.is_bodyweight).then_some(weight),
                reps: Some(reps),
                ..Default::default()
            }
        };

        match self.tracker.edit_set_parameters(&id, set_idx, &edit) {
            Ok(()) => self.persist("Zapisano"),
            Err(e) => self.status = e.to_string(),
        }
    }

    fn set_rest(&mut self, secs: u32) {
        self.tracker.set_rest_secs(secs);
        self.status = match self.app.set_preferred_rest(secs) {
            Ok(()) => format!("Przerwa: {secs}s"),
            Err(e) => e.to_string(),
        };
    }

    fn finish(&mut self) {
        if let Err(e) = self.app.commit_tracker(&self.tracker) {
            self.status = e.to_string();
            return;
        }
        match self.app.finish_active("", self.tracker.elapsed()) {
            Ok(_) => {
                self.finished = true;
                self.should_quit = true;
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(frame.area());

        let session = self.tracker.session();
        let rest = match self.tracker.rest().state() {
            RestState::Counting { remaining } => format!("Odpoczynek {remaining}s"),
            RestState::Idle if self.flash_until.is_some_and(|t| Instant::now() < t) => {
                "KONIEC PRZERWY!".to_string()
            }
            RestState::Idle => String::new(),
        };
        let header = Paragraph::new(format!(
            "{}  |  {}  |  {}/{} serii  {}",
            session.workout_title,
            format_clock(self.tracker.elapsed()),
            session.completed_sets(),
            session.total_sets(),
            rest
        ))
        .style(Style::default().fg(Color::Yellow).bold())
        .block(Block::default().borders(Borders::ALL).title("Wykuci AI"));
        frame.render_widget(header, chunks[0]);

        if !session.warmup_completed {
            let lines: Vec<Line> = session
                .warmup
                .iter()
                .map(|w| Line::from(format!("• {}  {}", w.name, w.instruction)))
                .collect();
            let warmup = Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title("Rozgrzewka AI"));
            frame.render_widget(warmup, chunks[1]);
        } else {
            let focus = self.tracker.focused();
            let rows: Vec<Row> = self
                .slots()
                .iter()
                .enumerate()
                .map(|(i, &(e, s))| {
                    let ex = &session.exercises[e];
                    let set = &ex.sets[s];
                    let load = if ex.is_timed {
                        format!("{} min", set.duration_minutes.unwrap_or(0))
                    } else if ex.is_bodyweight {
                        format!("BW x {}", set.reps.unwrap_or(0))
                    } else {
                        format!("{} kg x {}", set.weight.unwrap_or(0.0), set.reps.unwrap_or(0))
                    };
                    let mut style = Style::default();
                    if Some(ex.id.as_str()) == focus {
                        style = style.fg(Color::Yellow);
                    }
                    if set.completed {
                        style = style.fg(Color::DarkGray);
                    }
                    if i == self.cursor {
                        style = style.reversed();
                    }
                    Row::new(vec![
                        Cell::from(if s == 0 { ex.name.clone() } else { String::new() }),
                        Cell::from(format!("S{}", s + 1)),
                        Cell::from(load),
                        Cell::from(if set.completed { "✔" } else { "" }),
                    ])
                    .style(style)
                })
                .collect();

            let table = Table::new(
                rows,
                [
                    Constraint::Min(24),
                    Constraint::Length(4),
                    Constraint::Length(16),
                    Constraint::Length(3),
                ],
            )
            .header(Row::new(vec!["Ćwiczenie", "Seria", "Obciążenie", ""]).style(Style::default().bold()))
            .block(Block::default().borders(Borders::ALL).title("Sesja Treningowa"));
            frame.render_widget(table, chunks[1]);
        }

        let status = Paragraph::new(self.status.as_str())
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(status, chunks[2]);

        let keys = if session.warmup_completed {
            "↑↓ wybór | spacja seria | +/- kg | ]/[ powt. | 1/2/3 przerwa 45/60/90 | f zakończ | q wyjdź"
        } else {
            "w rozpocznij trening główny | q wyjdź"
        };
        let footer = Paragraph::new(keys)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[3]);
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('w') => match self.tracker.complete_warmup() {
                    Ok(()) => {
                        self.jump_to_focus();
                        self.persist("Rozgrzewka zaliczona");
                    }
                    Err(e) => self.status = e.to_string(),
                },
                KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
                KeyCode::Down => {
                    if self.cursor + 1 < self.slots().len() {
                        self.cursor += 1;
                    }
                }
                KeyCode::Char(' ') => self.toggle_selected(),
                KeyCode::Char('+') => self.adjust_selected(2.5, 0),
                KeyCode::Char('-') => self.adjust_selected(-2.5, 0),
                KeyCode::Char(']') => self.adjust_selected(0.0, 1),
                KeyCode::Char('[') => self.adjust_selected(0.0, -1),
                KeyCode::Char(c @ '1'..='3') => {
                    let idx = (c as u8 - b'1') as usize;
                    self.set_rest(REST_PRESETS[idx]);
                }
                KeyCode::Char('f') => self.finish(),
                _ => {}
            }
        }
        Ok(())
    }
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}
