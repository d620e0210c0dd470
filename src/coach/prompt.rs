//! Prompt templates and response schemas sent to the model

use serde_json::{Value, json};

use crate::model::{ExerciseLog, PlanType, UserProfile, WorkoutSession};

/// How many recent workouts are summarized for the model
pub const HISTORY_CONTEXT: usize = 3;

/// One line per recent workout with per-exercise average difficulty
pub fn history_summary(history: &[WorkoutSession]) -> String {
    if history.is_empty() {
        return "Brak poprzednich treningów.".to_string();
    }

    let start = history.len().saturating_sub(HISTORY_CONTEXT);
    history[start..]
        .iter()
        .map(|w| {
            let exercises = w
                .exercises
                .iter()
                .map(|e| {
                    format!(
                        "{} ({} serii, trudność średnia: {:.1})",
                        e.name,
                        e.sets.len(),
                        e.average_difficulty()
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "Data: {}, Cel: {}, Ćwiczenia: {}",
                w.date.format("%Y-%m-%d"),
                w.goal.label(),
                exercises
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn profile_block(profile: &UserProfile) -> String {
    let injuries = if profile.has_injuries() { profile.injuries.as_str() } else { "Brak" };
    let description = if profile.goal_description.trim().is_empty() {
        "-"
    } else {
        profile.goal_description.as_str()
    };
    format!(
        "- Imię: {}\n- Wiek: {} lat\n- Waga: {} kg\n- Wzrost: {} cm\n- Cel główny: {}\n- Dokładny cel: {}\n- Kontuzje/Ograniczenia: {}\n- Poziom: {}",
        profile.name,
        profile.age,
        profile.weight,
        profile.height,
        profile.goal.label(),
        description,
        injuries,
        profile.level.label(),
    )
}

pub fn plan_prompt(profile: &UserProfile, history: &[WorkoutSession], plan: PlanType) -> String {
    let place = match plan {
        PlanType::HomeBodyweight => "Dom, bez sprzętu (tylko masa ciała).",
        _ => "W pełni wyposażona siłownia.",
    };
    format!(
        "Jesteś doświadczonym trenerem personalnym.\n\
         Ułóż trening w stylu \"{style}\" dla użytkownika:\n\
         {profile}\n\n\
         Miejsce: {place}\n\
         Ostatnie treningi: {history}\n\n\
         Zasady:\n\
         1. Podaj krótki tytuł treningu i 3-5 ćwiczeń rozgrzewkowych.\n\
         2. Podaj 7-9 ćwiczeń głównych w kolejności wykonywania.\n\
         3. Omijaj ćwiczenia obciążające zgłoszone kontuzje.\n\
         4. Jeśli ostatnie treningi miały trudność 1-2, zwiększ lekko ciężar lub objętość; przy trudności 5 utrzymaj lub zmniejsz.\n\
         5. Ćwiczenia na czas oznacz isTimed=true i podaj durationMinutes; ćwiczenia z masą ciała oznacz isBodyweight=true.\n\
         6. suggestedWeight w kg (0 dla masy ciała i cardio).",
        style = plan.label(),
        profile = profile_block(profile),
        history = history_summary(history),
    )
}

pub fn swap_prompt(profile: &UserProfile, current: &ExerciseLog) -> String {
    let group = if current.muscle_group.is_empty() { "ta sama partia" } else { current.muscle_group.as_str() };
    format!(
        "Jesteś trenerem personalnym. Zaproponuj jedno ćwiczenie zastępcze za \"{name}\" \
         angażujące tę samą partię mięśni ({group}).\n\
         Użytkownik:\n{profile}\n\
         Nie proponuj ponownie \"{name}\". Zachowaj podobną liczbę serii ({sets}).",
        name = current.name,
        group = group,
        profile = profile_block(profile),
        sets = current.sets.len(),
    )
}

pub fn tip_prompt(profile: &UserProfile, exercise: &str) -> String {
    format!(
        "Jesteś trenerem personalnym. Podaj 2-3 zdania wskazówek technicznych do ćwiczenia \"{exercise}\" \
         dla osoby na poziomie: {level}. Kontuzje: {injuries}. Odpowiedz zwykłym tekstem, bez formatowania.",
        level = profile.level.label(),
        injuries = if profile.has_injuries() { profile.injuries.as_str() } else { "brak" },
    )
}

/// Schema of one exercise object, shared by plan and swap responses
pub fn exercise_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "muscleGroup": { "type": "STRING" },
            "isBodyweight": { "type": "BOOLEAN" },
            "isTimed": { "type": "BOOLEAN" },
            "setsCount": { "type": "NUMBER" },
            "repsTarget": { "type": "NUMBER" },
            "suggestedWeight": { "type": "NUMBER", "description": "kg, 0 dla masy ciała" },
            "durationMinutes": { "type": "NUMBER" }
        },
        "required": ["name", "muscleGroup", "isBodyweight", "isTimed", "setsCount", "repsTarget", "suggestedWeight"]
    })
}

pub fn plan_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "workoutTitle": { "type": "STRING" },
            "warmup": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "instruction": { "type": "STRING" }
                    },
                    "required": ["name", "instruction"]
                }
            },
            "exercises": { "type": "ARRAY", "items": exercise_schema() }
        },
        "required": ["workoutTitle", "warmup", "exercises"]
    })
}
