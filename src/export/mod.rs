//! PDF history report

mod pdf;

pub use pdf::{ReportPdf, TableRow};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::model::{UserProfile, WorkoutSession, format_clock};

pub const HEADERS: [&str; 6] = ["Data", "Cwiczenie", "Serie", "Obciazenie", "Powt/Czas", "Czas Sesji"];

/// Map Polish diacritics to ASCII; anything else non-ASCII becomes `?`.
///
/// The report uses the base Helvetica font, which has no glyphs for them.
pub fn latinize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ą' => 'a',
            'ć' => 'c',
            'ę' => 'e',
            'ł' => 'l',
            'ń' => 'n',
            'ó' => 'o',
            'ś' => 's',
            'ź' | 'ż' => 'z',
            'Ą' => 'A',
            'Ć' => 'C',
            'Ę' => 'E',
            'Ł' => 'L',
            'Ń' => 'N',
            'Ó' => 'O',
            'Ś' => 'S',
            'Ź' | 'Ż' => 'Z',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}

/// `Raport_Wykuci_<name>_<date>.pdf`
pub fn default_file_name(profile_name: &str, date: NaiveDate) -> String {
    let name: String = latinize(profile_name)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("Raport_Wykuci_{}_{}.pdf", name, date.format("%Y-%m-%d"))
}

/// Table body: newest session first, one row per set
pub fn history_rows(history: &[WorkoutSession]) -> Vec<TableRow> {
    let mut rows = Vec::new();

    for (i, session) in history.iter().rev().enumerate() {
        if i > 0 {
            rows.push(TableRow::Spacer);
        }
        let title = if session.workout_title.trim().is_empty() {
            "Trening"
        } else {
            session.workout_title.as_str()
        };
        rows.push(TableRow::Section(latinize(title)));

        let date = session.date.with_timezone(&Local).format("%d.%m.%Y").to_string();
        let clock = format_clock(session.duration_seconds);

        for (ex_idx, exercise) in session.exercises.iter().enumerate() {
            for (set_idx, set) in exercise.sets.iter().enumerate() {
                let load = if exercise.is_bodyweight {
                    "BW".to_string()
                } else {
                    format!("{} kg", set.weight.unwrap_or(0.0))
                };
                let amount = if exercise.is_timed {
                    format!("{} min", set.duration_minutes.unwrap_or(0))
                } else {
                    set.reps.unwrap_or(0).to_string()
                };

                rows.push(TableRow::Cells(vec![
                    if ex_idx == 0 && set_idx == 0 { date.clone() } else { String::new() },
                    if set_idx == 0 { latinize(&exercise.name) } else { String::new() },
                    format!("S{}", set_idx + 1),
                    load,
                    amount,
                    clock.clone(),
                ]));
            }
        }

        if let Some(note) = session.note.as_deref().filter(|n| !n.is_empty()) {
            rows.push(TableRow::Note(format!("Notatka: {}", latinize(note))));
        }
    }
    rows
}

/// Render the whole report into PDF bytes
pub fn render_report(profile: &UserProfile, history: &[WorkoutSession], today: NaiveDate) -> Vec<u8> {
    let title = format!("RAPORT WYKUCI AI: {}", latinize(&profile.name));
    let status = if profile.is_pro { "PRO ACCOUNT" } else { "FREE ACCOUNT" };
    let subtitle = vec![
        format!("Status: {status}"),
        format!("Data generowania: {}", today.format("%d.%m.%Y")),
    ];

    let mut pdf = ReportPdf::new();
    pdf.write_report(&title, &subtitle, &HEADERS, &history_rows(history));
    pdf.finish()
}

/// Write the report; `target` may be a directory (default file name is used)
pub fn export_history(
    profile: &UserProfile,
    history: &[WorkoutSession],
    target: &Path,
    today: NaiveDate,
) -> std::io::Result<PathBuf> {
    let path = if target.is_dir() {
        target.join(default_file_name(&profile.name, today))
    } else {
        target.to_path_buf()
    };

    let bytes = render_report(profile, history, today);
    fs::write(&path, &bytes)?;
    info!(path = %path.display(), sessions = history.len(), "PDF report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExerciseLog, GoalType, PlanType, SetLog};
    use chrono::Utc;

    fn session(title: &str, note: Option<&str>) -> WorkoutSession {
        WorkoutSession {
            id: title.into(),
            date: Utc::now(),
            goal: GoalType::Gym,
            plan_type: PlanType::Fbw,
            workout_title: title.into(),
            warmup: vec![],
            exercises: vec![
                ExerciseLog {
                    id: "e1".into(),
                    name: "Wyciskanie leżąc".into(),
                    muscle_group: "klatka".into(),
                    is_bodyweight: false,
                    is_timed: false,
                    sets: vec![
                        SetLog::planned(Some(8), Some(70.0), None),
                        SetLog::planned(Some(8), Some(72.5), None),
                    ],
                },
                ExerciseLog {
                    id: "e2".into(),
                    name: "Bieżnia".into(),
                    muscle_group: "cardio".into(),
                    is_bodyweight: true,
                    is_timed: true,
                    sets: vec![SetLog::planned(None, None, Some(15))],
                },
            ],
            duration_seconds: 3725,
            note: note.map(String::from),
            warmup_completed: true,
            swaps_used: 0,
            tips_used: 0,
            ad_credits: 0,
        }
    }

    #[test]
    fn test_latinize() {
        assert_eq!(latinize("Zażółć gęślą jaźń"), "Zazolc gesla jazn");
        assert_eq!(latinize("ŁÓDŹ"), "LODZ");
        assert_eq!(latinize("kg→lb"), "kg?lb");
    }

    #[test]
    fn test_default_file_name() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        assert_eq!(default_file_name("Łukasz K", date), "Raport_Wykuci_Lukasz_K_2026-03-14.pdf");
    }

    #[test]
    fn test_rows_layout() {
        let rows = history_rows(&[session("Pierwszy", None), session("Drugi", Some("ciężko"))]);

        // newest first
        assert_eq!(rows[0], TableRow::Section("Drugi".into()));
        let TableRow::Cells(first) = &rows[1] else { panic!("expected cells") };
        assert!(!first[0].is_empty());
        assert_eq!(first[1], "Wyciskanie lezac");
        assert_eq!(first[2], "S1");
        assert_eq!(first[3], "70 kg");
        assert_eq!(first[4], "8");
        assert_eq!(first[5], "62:05");

        let TableRow::Cells(second) = &rows[2] else { panic!("expected cells") };
        assert!(second[0].is_empty());
        assert!(second[1].is_empty());
        assert_eq!(second[3], "72.5 kg");

        let TableRow::Cells(cardio) = &rows[3] else { panic!("expected cells") };
        assert_eq!(cardio[3], "BW");
        assert_eq!(cardio[4], "15 min");

        assert_eq!(rows[4], TableRow::Note("Notatka: ciezko".into()));
        assert_eq!(rows[5], TableRow::Spacer);
        assert_eq!(rows[6], TableRow::Section("Pierwszy".into()));
        assert_eq!(rows.len(), 10);
    }

    #[test]
    fn test_export_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let profile = UserProfile::new("Ania", 27, 58.0, 168, GoalType::Running);
        let today = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();

        let path = export_history(&profile, &[session("A", None)], dir.path(), today).unwrap();
        assert_eq!(path.file_name().unwrap(), "Raport_Wykuci_Ania_2026-01-02.pdf");
        let bytes = fs::read(path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
