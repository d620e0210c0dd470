//! wykuci - AI-planned strength training tracker
//!
//! Wykuci AI: guided sessions, rest timer, AI coach.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wykuci::app::ProfileUpdate;
use wykuci::coach::GeminiCoach;
use wykuci::coach::gemini::{DEFAULT_API_URL, DEFAULT_MODEL};
use wykuci::db::{Database, StateStore};
use wykuci::entitlement;
use wykuci::metrics::{Analytics, XP_PER_LEVEL};
use wykuci::model::{Gender, GoalType, Level, PlanType, UserProfile, WorkoutSession, format_clock};
use wykuci::session::SetEdit;
use wykuci::tui::SessionScreen;
use wykuci::{App, AppError};

#[derive(Parser)]
#[command(name = "wykuci")]
#[command(author, version, about = "Wykuci AI - treningi planowane przez AI")]
struct Cli {
    /// SQLite file holding the app state
    #[arg(long, env = "WYKUCI_DB", default_value = "wykuci.db", global = true)]
    db: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    #[arg(long, env = "WYKUCI_MODEL", default_value = DEFAULT_MODEL, global = true)]
    model: String,

    #[arg(long, env = "WYKUCI_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the profile
    Onboard {
        name: String,
        #[arg(long)]
        age: u32,
        /// Body weight in kg
        #[arg(long)]
        weight: f64,
        /// Height in cm
        #[arg(long)]
        height: u32,
        #[arg(long, value_enum)]
        goal: GoalType,
        #[arg(long, value_enum, default_value = "unspecified")]
        gender: Gender,
        #[arg(long, value_enum, default_value = "intermediate")]
        level: Level,
        #[arg(long)]
        injuries: Option<String>,
        /// Free-text goal, e.g. "podciągnąć się 10 razy"
        #[arg(long)]
        goal_description: Option<String>,
    },

    /// Show profile, level and XP
    Profile,

    /// Change profile settings
    Settings {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_enum)]
        gender: Option<Gender>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long, value_enum)]
        goal: Option<GoalType>,
        #[arg(long)]
        goal_description: Option<String>,
        #[arg(long)]
        injuries: Option<String>,
        #[arg(long, value_enum)]
        level: Option<Level>,
        #[arg(long)]
        haptics: Option<bool>,
        /// Rest between sets in seconds
        #[arg(long)]
        rest: Option<u32>,
    },

    /// Toggle PRO (no real payment)
    Pro,

    /// Generate a new workout with the AI coach
    Plan {
        #[arg(value_enum)]
        plan: Option<PlanType>,
    },

    /// Show the active workout
    Show,

    /// Mark the warm-up as done
    WarmupDone,

    /// Toggle a set (exercise and set are 1-based)
    Toggle { exercise: usize, set: usize },

    /// Edit set parameters
    Edit {
        exercise: usize,
        set: usize,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        reps: Option<u32>,
        #[arg(long)]
        minutes: Option<u32>,
        /// 1 (easy) - 5 (max)
        #[arg(long)]
        difficulty: Option<u8>,
    },

    /// Swap an exercise for an AI alternative
    Swap { exercise: usize },

    /// AI technique tip for an exercise
    Tip { exercise: usize },

    /// Watch an ad to unlock one more AI use in this workout
    WatchAd,

    /// Remove an exercise from the active workout
    Delete { exercise: usize },

    /// Finish the workout and save it to history
    Finish {
        #[arg(short, long, default_value = "")]
        note: String,
        /// Override session time in seconds
        #[arg(long)]
        elapsed: Option<u64>,
    },

    /// Drop the active workout without saving
    Abandon,

    /// List finished workouts
    History {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show one finished workout
    Detail { id: String },

    /// Show training statistics
    Stats {
        /// Filter by exercise name
        exercise: Option<String>,
    },

    /// Export the history as PDF (PRO)
    Export {
        /// File or directory
        #[arg(default_value = ".")]
        target: PathBuf,
    },

    /// Delete all data
    Reset {
        #[arg(long)]
        yes: bool,
    },

    /// Open the live session screen
    Tui,
}

fn coach(cli: &Cli) -> Result<GeminiCoach> {
    let key = cli.api_key.clone().unwrap_or_default();
    GeminiCoach::new(key, cli.model.clone(), cli.api_url.clone()).context("AI coach unavailable (set GEMINI_API_KEY)")
}

/// 1-based position in the active workout to exercise id
fn exercise_id<S: StateStore>(app: &App<S>, position: usize) -> Result<String> {
    let session = app.active().ok_or(AppError::NoActiveSession)?;
    position
        .checked_sub(1)
        .and_then(|i| session.exercises.get(i))
        .map(|e| e.id.clone())
        .with_context(|| format!("no exercise #{position} (workout has {})", session.exercises.len()))
}

/// 1-based set number to index; 0 is rejected
fn set_index(position: usize) -> Result<usize> {
    position.checked_sub(1).context("sets are numbered from 1")
}

fn print_session(session: &WorkoutSession) {
    println!("{} [{}]", session.workout_title, session.plan_type.label());
    println!("{:-<60}", "");
    if !session.warmup.is_empty() {
        let mark = if session.warmup_completed { "✔" } else { " " };
        println!("[{mark}] Rozgrzewka:");
        for item in &session.warmup {
            println!("      {} - {}", item.name, item.instruction);
        }
    }
    for (i, ex) in session.exercises.iter().enumerate() {
        let mark = if ex.is_done() { "✔" } else { " " };
        println!("[{mark}] {}. {} ({})", i + 1, ex.name, ex.muscle_group);
        for (j, set) in ex.sets.iter().enumerate() {
            let load = if ex.is_timed {
                format!("{} min", set.duration_minutes.unwrap_or(0))
            } else if ex.is_bodyweight {
                format!("BW x {}", set.reps.unwrap_or(0))
            } else {
                format!("{} kg x {}", set.weight.unwrap_or(0.0), set.reps.unwrap_or(0))
            };
            let done = if set.completed { "x" } else { " " };
            println!("      [{done}] S{} {:16} trudność {}", j + 1, load, set.difficulty);
        }
    }
    println!(
        "Serie: {}/{} | Objętość: {:.0} kg | Czas: {}",
        session.completed_sets(),
        session.total_sets(),
        session.volume(),
        format_clock(session.duration_seconds)
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = Database::open(&cli.db).with_context(|| format!("opening {}", cli.db))?;

    // reset must work even when the stored state no longer parses
    if let Some(Commands::Reset { yes }) = &cli.command {
        if !yes {
            bail!("this deletes the profile and all workouts; repeat with --yes");
        }
        db.clear()?;
        info!(db = %cli.db, "account reset");
        println!("Konto usunięte");
        return Ok(());
    }

    let mut app = App::load(db).context("stored state unreadable, `wykuci reset --yes` starts over")?;

    match &cli.command {
        Some(Commands::Onboard {
            name,
            age,
            weight,
            height,
            goal,
            gender,
            level,
            injuries,
            goal_description,
        }) => {
            if app.state().profile.is_some() {
                bail!("profile already exists, use `settings` or `reset`");
            }
            let mut profile = UserProfile::new(name, *age, *weight, *height, *goal);
            profile.gender = *gender;
            profile.level = *level;
            if let Some(i) = injuries {
                profile.injuries = i.clone();
            }
            if let Some(d) = goal_description {
                profile.goal_description = d.clone();
            }
            app.onboard(profile)?;
            println!("Witaj, {name}! Wygeneruj pierwszy trening: wykuci plan");
        }

        Some(Commands::Profile) => {
            let p = app.profile()?;
            println!("{} | {} lat | {} kg | {} cm", p.name, p.age, p.weight, p.height);
            println!("Cel: {} | Poziom: {}", p.goal.label(), p.level.label());
            if !p.goal_description.is_empty() {
                println!("Dokładny cel: {}", p.goal_description);
            }
            println!("Kontuzje: {}", p.injuries);
            println!(
                "LVL {} | {} XP (do następnego: {})",
                p.progress.level,
                p.progress.xp,
                XP_PER_LEVEL - p.progress.xp % XP_PER_LEVEL
            );
            println!("Przerwa: {}s | PRO: {}", p.preferred_rest_secs, if p.is_pro { "tak" } else { "nie" });
            if entitlement::shows_ads(p) {
                println!("Darmowy plan: 1 zamiana i 1 porada AI na trening");
            }
        }

        Some(Commands::Settings {
            name,
            gender,
            age,
            weight,
            height,
            goal,
            goal_description,
            injuries,
            level,
            haptics,
            rest,
        }) => {
            let changes = ProfileUpdate {
                name: name.clone(),
                gender: *gender,
                age: *age,
                weight: *weight,
                height: *height,
                goal: *goal,
                goal_description: goal_description.clone(),
                injuries: injuries.clone(),
                level: *level,
                haptics_enabled: *haptics,
                default_plan: None,
            };
            app.update_profile(&changes)?;
            if let Some(secs) = rest {
                app.set_preferred_rest(*secs)?;
            }
            println!("Zapisano ustawienia");
        }

        Some(Commands::Pro) => {
            let pro = app.toggle_pro()?;
            println!("PRO: {}", if pro { "aktywne" } else { "wyłączone" });
        }

        Some(Commands::Plan { plan }) => {
            let plan = (*plan)
                .or(app.profile()?.default_plan)
                .unwrap_or(PlanType::AiAdvisor);
            let coach = coach(&cli)?;
            println!("Generowanie treningu ({})...", plan.label());
            let session = app.generate_session(&coach, plan).await?;
            print_session(session);
        }

        Some(Commands::Show) => {
            let session = app.active().ok_or(AppError::NoActiveSession)?;
            print_session(session);
        }

        Some(Commands::WarmupDone) => {
            app.with_tracker(|t| t.complete_warmup())?;
            println!("Rozgrzewka zaliczona, czas na trening główny");
        }

        Some(Commands::Toggle { exercise, set }) => {
            let id = exercise_id(&app, *exercise)?;
            let set = set_index(*set)?;
            let outcome = app.with_tracker(|t| t.toggle_set_completion(&id, set))?;
            if outcome.completed {
                println!("Seria zaliczona. Odpoczynek: {}s", app.profile()?.preferred_rest_secs);
            } else {
                println!("Seria cofnięta");
            }
        }

        Some(Commands::Edit {
            exercise,
            set,
            weight,
            reps,
            minutes,
            difficulty,
        }) => {
            let id = exercise_id(&app, *exercise)?;
            let set = set_index(*set)?;
            let edit = SetEdit {
                weight: *weight,
                reps: *reps,
                duration_minutes: *minutes,
                difficulty: *difficulty,
            };
            app.with_tracker(|t| t.edit_set_parameters(&id, set, &edit))?;
            println!("Zapisano serię");
        }

        Some(Commands::Swap { exercise }) => {
            let id = exercise_id(&app, *exercise)?;
            let coach = coach(&cli)?;
            let replacement = app.swap_exercise(&coach, &id).await?;
            println!("Nowe ćwiczenie: {} ({} serii)", replacement.name, replacement.sets.len());
        }

        Some(Commands::Tip { exercise }) => {
            let id = exercise_id(&app, *exercise)?;
            let coach = coach(&cli)?;
            let tip = app.coaching_tip(&coach, &id).await?;
            println!("{tip}");
        }

        Some(Commands::WatchAd) => {
            app.watch_ad()?;
            println!("Dzięki! Odblokowano jedno dodatkowe użycie AI");
        }

        Some(Commands::Delete { exercise }) => {
            let id = exercise_id(&app, *exercise)?;
            let removed = app.with_tracker(|t| t.delete_exercise(&id))?;
            println!("Usunięto: {}", removed.name);
        }

        Some(Commands::Finish { note, elapsed }) => {
            let session = app.active().ok_or(AppError::NoActiveSession)?;
            let wall = (Utc::now() - session.date).num_seconds().max(0) as u64;
            let elapsed = elapsed.unwrap_or(wall).max(session.duration_seconds);
            let finished = app.finish_active(note, elapsed)?;
            println!(
                "Trening zapisany: {} | {} | {:.0} kg",
                finished.workout_title,
                format_clock(finished.duration_seconds),
                finished.volume()
            );
            let p = app.profile()?;
            println!("+XP -> LVL {} ({} XP)", p.progress.level, p.progress.xp);
        }

        Some(Commands::Abandon) => {
            let dropped = app.abandon_active()?;
            println!("Porzucono: {}", dropped.workout_title);
        }

        Some(Commands::History { limit }) => {
            println!("Historia treningów:");
            println!("{:-<60}", "");
            for w in app.history().iter().rev().take(*limit) {
                println!(
                    "{} | {:24} | {:>6} | {:.0} kg | {}",
                    w.date.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    w.workout_title,
                    format_clock(w.duration_seconds),
                    w.volume(),
                    w.id
                );
            }
        }

        Some(Commands::Detail { id }) => {
            let session = app.session_detail(id).with_context(|| format!("no workout {id}"))?;
            print_session(session);
            if let Some(note) = &session.note {
                println!("Notatka: {note}");
            }
        }

        Some(Commands::Stats { exercise }) => {
            let analytics = Analytics::new(app.history());
            let today = Local::now().date_naive();

            println!("Statystyki");
            println!("{:-<40}", "");

            if let Some(ex) = exercise {
                println!("Ćwiczenie: {ex}");
                println!("Objętość: {:.0} kg", analytics.exercise_volume(ex));
                match analytics.average_difficulty(ex) {
                    Some(d) => println!("Średnia trudność: {d:.1}"),
                    None => println!("Brak danych"),
                }
            } else {
                println!("Treningi: {}", app.history().len());
                println!("Objętość łącznie: {:.0} kg", analytics.total_volume());
                println!("Czas łącznie: {}", format_clock(analytics.total_duration()));
                println!("Seria dni: {}", analytics.current_streak(today));
                println!("Częstotliwość: {:.1} treningów/tydzień", analytics.weekly_frequency());

                let strip: String = analytics
                    .activity_strip(today)
                    .iter()
                    .map(|(_, active)| if *active { '■' } else { '□' })
                    .collect();
                println!("Ostatnie 7 dni: {strip}");

                let weight = app.profile().ok().map(|p| p.weight);
                for (date, score) in analytics.power_scores(weight) {
                    println!("  {} moc {}", date.format("%d.%m"), score);
                }
            }
        }

        Some(Commands::Export { target }) => {
            let path = app.export_pdf(target, Local::now().date_naive())?;
            println!("Zapisano raport: {}", path.display());
        }

        // handled before loading
        Some(Commands::Reset { .. }) => {}

        Some(Commands::Tui) | None => {
            if app.active().is_none() {
                println!("Brak aktywnego treningu. Wygeneruj go: wykuci plan");
                return Ok(());
            }
            SessionScreen::new(&mut app)?.run()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_index_is_one_based() {
        assert_eq!(set_index(1).unwrap(), 0);
        assert_eq!(set_index(3).unwrap(), 2);
        assert!(set_index(0).is_err());
    }

    #[test]
    fn test_reset_parses_without_loading() {
        let cli = Cli::try_parse_from(["wykuci", "--db", "x.db", "reset", "--yes"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Reset { yes: true })));
    }
}
