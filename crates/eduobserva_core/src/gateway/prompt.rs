//! Prompt builders and response decoding for AI requests.
//!
//! All functions here are pure; the HTTP client only moves their output.

use crate::gateway::{GatewayError, GatewayResult};
use crate::model::observation::{ObservationScore, TeacherObservation};
use crate::model::report::AiReport;
use crate::model::rubric::{Dimension, Rubric};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static CODE_FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").expect("valid code fence regex")
});

pub const IMAGE_ANALYSIS_INSTRUCTION: &str = "Describe qué aspectos de la práctica docente se observan en esta imagen y cómo se relacionan con las dimensiones pedagógicas.";
pub const TRANSCRIPTION_INSTRUCTION: &str =
    "Transcribe exactamente lo que se dice en este audio de observación.";
pub const CHAT_SYSTEM_INSTRUCTION: &str = "Eres un asesor pedagógico experto. Usa Google Search para encontrar las mejores estrategias, libros y recursos actualizados.";
/// Returned when image analysis yields no text.
pub const IMAGE_ANALYSIS_FALLBACK: &str = "No se pudo analizar la imagen.";

const MISSING_SCORE: &str = "N/A";
const MISSING_NOTES: &str = "Sin notas";

/// Builds the per-dimension score summary embedded in the report prompt.
pub fn scores_summary(observation: &TeacherObservation, rubric: &Rubric) -> String {
    rubric
        .dimensions()
        .iter()
        .map(|dimension| {
            let lines = dimension
                .criteria
                .iter()
                .map(|criterion| {
                    let score = observation
                        .score_for(&criterion.id)
                        .map_or_else(|| MISSING_SCORE.to_string(), |s| s.value().to_string());
                    let notes = match observation.notes_for(&criterion.id).trim() {
                        "" => MISSING_NOTES,
                        notes => notes,
                    };
                    format!("{}: {score}/5 - Notas: {notes}", criterion.label)
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("### {}\n{lines}", dimension.title)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the report prompt for one observation.
pub fn report_prompt(observation: &TeacherObservation, rubric: &Rubric) -> String {
    format!(
        "Analiza la observación de {observer} al docente {teacher}.\n\
         NOTAS: {notes}\n\
         PUNTAJES: {scores}\n\
         Genera JSON: observedAspects, improvementFocus, praxisSuggestions, dialogueProposal.",
        observer = observation.observer_name,
        teacher = observation.teacher_name,
        notes = observation.general_notes,
        scores = scores_summary(observation, rubric),
    )
}

/// Builds the improvement-suggestion prompt for one dimension.
pub fn suggestion_prompt(
    dimension: &Dimension,
    scores: &BTreeMap<String, ObservationScore>,
) -> String {
    let relevant = dimension
        .criteria
        .iter()
        .map(|criterion| {
            let score = scores
                .get(&criterion.id)
                .and_then(|entry| entry.score)
                .map_or_else(|| MISSING_SCORE.to_string(), |s| s.value().to_string());
            format!("- {}: {score}", criterion.label)
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Sugiere mejoras para la dimensión \"{}\" basadas en: {relevant}",
        dimension.title
    )
}

pub fn speech_prompt(text: &str) -> String {
    format!("Lee profesionalmente: {text}")
}

/// Removes one surrounding markdown code fence, if present.
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE_RE.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// Decodes a report response, requiring all four string sections.
pub fn decode_report(text: &str) -> GatewayResult<AiReport> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(GatewayError::EmptyResponse);
    }
    serde_json::from_str::<AiReport>(body)
        .map_err(|err| GatewayError::MalformedResponse(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{decode_report, strip_code_fence, suggestion_prompt};
    use crate::gateway::GatewayError;
    use crate::model::observation::{ObservationScore, Score};
    use crate::model::rubric::reference_rubric;
    use std::collections::BTreeMap;

    const REPORT_JSON: &str = r#"{"observedAspects":"a","improvementFocus":"b","praxisSuggestions":"c","dialogueProposal":"d"}"#;

    #[test]
    fn decode_report_accepts_plain_and_fenced_json() {
        let plain = decode_report(REPORT_JSON).expect("plain json decodes");
        assert_eq!(plain.dialogue_proposal, "d");

        let fenced = format!("```json\n{REPORT_JSON}\n```");
        assert_eq!(decode_report(&fenced).expect("fenced json decodes"), plain);
    }

    #[test]
    fn decode_report_rejects_missing_section() {
        let err = decode_report(r#"{"observedAspects":"a"}"#).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[test]
    fn decode_report_rejects_empty_object_and_blank_text() {
        assert!(matches!(
            decode_report("{}").unwrap_err(),
            GatewayError::MalformedResponse(_)
        ));
        assert_eq!(decode_report("  ").unwrap_err(), GatewayError::EmptyResponse);
    }

    #[test]
    fn strip_code_fence_leaves_unfenced_text() {
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn suggestion_prompt_marks_unscored_criteria() {
        let dimension = reference_rubric().dimension("planeacion").unwrap();
        let mut scores = BTreeMap::new();
        scores.insert(
            "p1".to_string(),
            ObservationScore {
                criterion_id: "p1".to_string(),
                score: Some(Score::new(4).unwrap()),
                notes: String::new(),
            },
        );

        let prompt = suggestion_prompt(dimension, &scores);
        assert!(prompt.contains("\"Planeación\""));
        assert!(prompt.contains("- Aprendizaje Activo: 4"));
        assert!(prompt.contains("- Contexto Sociocultural: N/A"));
    }
}
