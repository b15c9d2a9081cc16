//! Observation capture workflow.
//!
//! # Responsibility
//! - Hold the draft of one observation: basic info, per-criterion scores and
//!   notes, the active dimension, and per-dimension AI suggestion slots.
//! - Bind asynchronous AI results (suggestions, image analysis, audio
//!   transcription) back into the draft.
//! - Finalize the draft into an immutable `TeacherObservation`.
//!
//! # Invariants
//! - `draft_scores` has at most one entry per criterion; setters overwrite.
//! - Only criterion ids present in the rubric are accepted.
//! - `active_dimension_index` stays in `0..dimension_count`; navigation
//!   clamps instead of wrapping.
//! - A pending suggestion slot or evidence request refuses duplicates until
//!   it completes; completion always clears the pending mark.
//! - Evidence text is appended to notes, never replacing them.
//! - `submit` returns a copy; later draft edits never reach stored history.
//!
//! # Async model
//! Each AI operation has a `begin_*` step (marks pending, returns a request
//! snapshot) and a `complete_*`/`apply_*` step (stores the result). Hosts
//! that keep editing while a request is in flight call the two halves
//! themselves; the `async` helpers compose them for sequential callers.

use crate::gateway::{AiGateway, GatewayError, GatewayResult};
use crate::model::observation::{
    ObservationId, ObservationScore, Score, TeacherObservation, SCORE_MAX, SCORE_MIN,
};
use crate::model::rubric::{Dimension, Rubric};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Label prefixed to appended image analysis text.
pub const IMAGE_ANALYSIS_LABEL: &str = "[Análisis de Imagen]: ";

/// Required basic-info fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicInfoField {
    TeacherName,
    SchoolName,
}

impl BasicInfoField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TeacherName => "teacher_name",
            Self::SchoolName => "school_name",
        }
    }
}

/// User-correctable draft input errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingField(BasicInfoField),
    UnknownCriterion(String),
    ScoreOutOfRange(u8),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field is empty: {}", field.as_str()),
            Self::UnknownCriterion(id) => write!(f, "criterion is not part of the rubric: {id}"),
            Self::ScoreOutOfRange(value) => write!(
                f,
                "score {value} is outside the allowed range {SCORE_MIN}..={SCORE_MAX}"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Failure of an evidence capture call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    Validation(ValidationError),
    Gateway(GatewayError),
}

impl Display for CaptureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Gateway(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CaptureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Gateway(err) => Some(err),
        }
    }
}

impl From<ValidationError> for CaptureError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<GatewayError> for CaptureError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}

/// Visit metadata entered before scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicInfo {
    pub teacher_name: String,
    pub school_name: String,
    pub observer_name: String,
}

/// AI suggestion state for one dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionSlot {
    pub text: String,
    pub pending: bool,
}

/// Snapshot sent to the gateway for a dimension suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRequest {
    pub dimension: Dimension,
    pub scores: BTreeMap<String, ObservationScore>,
}

/// Evidence source attached to a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EvidenceKind {
    Image,
    Audio,
}

impl EvidenceKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }
}

/// Ticket for one in-flight evidence request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceRequest {
    pub criterion_id: String,
    pub kind: EvidenceKind,
}

/// Appends evidence text to existing notes.
///
/// Image analysis goes on a new labelled line, transcriptions are joined
/// with a space. Blank results leave notes unchanged.
pub fn append_evidence(notes: &str, kind: EvidenceKind, text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return notes.to_string();
    }
    let addition = match kind {
        EvidenceKind::Image => format!("{IMAGE_ANALYSIS_LABEL}{text}"),
        EvidenceKind::Audio => text.to_string(),
    };
    if notes.is_empty() {
        return addition;
    }
    let separator = match kind {
        EvidenceKind::Image => "\n",
        EvidenceKind::Audio => " ",
    };
    format!("{notes}{separator}{addition}")
}

/// Draft state for one observation form.
#[derive(Debug, Clone)]
pub struct CaptureWorkflow<'r> {
    rubric: &'r Rubric,
    basic_info: BasicInfo,
    general_notes: String,
    active_dimension_index: usize,
    draft_scores: BTreeMap<String, ObservationScore>,
    suggestions: BTreeMap<String, SuggestionSlot>,
    pending_evidence: BTreeSet<String>,
}

impl<'r> CaptureWorkflow<'r> {
    /// Starts an empty draft positioned on the first dimension.
    pub fn new(rubric: &'r Rubric) -> Self {
        Self {
            rubric,
            basic_info: BasicInfo::default(),
            general_notes: String::new(),
            active_dimension_index: 0,
            draft_scores: BTreeMap::new(),
            suggestions: BTreeMap::new(),
            pending_evidence: BTreeSet::new(),
        }
    }

    pub fn rubric(&self) -> &'r Rubric {
        self.rubric
    }

    pub fn basic_info(&self) -> &BasicInfo {
        &self.basic_info
    }

    pub fn set_teacher_name(&mut self, value: impl Into<String>) {
        self.basic_info.teacher_name = value.into();
    }

    pub fn set_school_name(&mut self, value: impl Into<String>) {
        self.basic_info.school_name = value.into();
    }

    pub fn set_observer_name(&mut self, value: impl Into<String>) {
        self.basic_info.observer_name = value.into();
    }

    pub fn general_notes(&self) -> &str {
        &self.general_notes
    }

    pub fn set_general_notes(&mut self, value: impl Into<String>) {
        self.general_notes = value.into();
    }

    // Navigation.

    pub fn active_dimension_index(&self) -> usize {
        self.active_dimension_index
    }

    pub fn active_dimension(&self) -> &'r Dimension {
        let rubric: &'r Rubric = self.rubric;
        &rubric.dimensions()[self.active_dimension_index]
    }

    pub fn is_last_dimension(&self) -> bool {
        self.active_dimension_index + 1 == self.rubric.dimension_count()
    }

    /// Moves to the next dimension; no-op on the last one.
    pub fn advance(&mut self) {
        if !self.is_last_dimension() {
            self.active_dimension_index += 1;
        }
    }

    /// Moves to the previous dimension; no-op on the first one.
    pub fn retreat(&mut self) {
        self.active_dimension_index = self.active_dimension_index.saturating_sub(1);
    }

    /// Jumps to `index`, clamped to the last dimension.
    pub fn go_to(&mut self, index: usize) {
        self.active_dimension_index = index.min(self.rubric.dimension_count() - 1);
    }

    // Scores and notes.

    pub fn draft_scores(&self) -> &BTreeMap<String, ObservationScore> {
        &self.draft_scores
    }

    pub fn score_entry(&self, criterion_id: &str) -> Option<&ObservationScore> {
        self.draft_scores.get(criterion_id)
    }

    /// Sets the score for one criterion, replacing any previous value.
    pub fn set_score(&mut self, criterion_id: &str, value: u8) -> Result<(), ValidationError> {
        let score = Score::new(value).map_err(|err| ValidationError::ScoreOutOfRange(err.0))?;
        self.entry_mut(criterion_id)?.score = Some(score);
        Ok(())
    }

    /// Removes the score for one criterion, keeping its notes.
    pub fn clear_score(&mut self, criterion_id: &str) -> Result<(), ValidationError> {
        self.ensure_criterion(criterion_id)?;
        if let Some(entry) = self.draft_scores.get_mut(criterion_id) {
            entry.score = None;
        }
        Ok(())
    }

    /// Replaces the notes for one criterion.
    pub fn set_notes(
        &mut self,
        criterion_id: &str,
        text: impl Into<String>,
    ) -> Result<(), ValidationError> {
        self.entry_mut(criterion_id)?.notes = text.into();
        Ok(())
    }

    fn ensure_criterion(&self, criterion_id: &str) -> Result<(), ValidationError> {
        if self.rubric.criterion(criterion_id).is_none() {
            return Err(ValidationError::UnknownCriterion(criterion_id.to_string()));
        }
        Ok(())
    }

    fn entry_mut(&mut self, criterion_id: &str) -> Result<&mut ObservationScore, ValidationError> {
        self.ensure_criterion(criterion_id)?;
        Ok(self
            .draft_scores
            .entry(criterion_id.to_string())
            .or_insert_with(|| ObservationScore::empty(criterion_id)))
    }

    // Dimension suggestions.

    pub fn suggestion(&self, dimension_id: &str) -> Option<&SuggestionSlot> {
        self.suggestions.get(dimension_id)
    }

    /// Marks the active dimension's suggestion as pending.
    ///
    /// Returns `None` while a request for that dimension is still pending.
    pub fn begin_suggestion(&mut self) -> Option<SuggestionRequest> {
        let dimension = self.active_dimension();
        if self
            .suggestions
            .get(&dimension.id)
            .is_some_and(|slot| slot.pending)
        {
            return None;
        }

        self.suggestions.insert(
            dimension.id.clone(),
            SuggestionSlot {
                text: String::new(),
                pending: true,
            },
        );
        Some(SuggestionRequest {
            dimension: dimension.clone(),
            scores: self.draft_scores.clone(),
        })
    }

    /// Stores a suggestion result; on failure the slot is removed so the
    /// request can be retried.
    pub fn complete_suggestion(
        &mut self,
        dimension_id: &str,
        result: GatewayResult<String>,
    ) -> GatewayResult<()> {
        match result {
            Ok(text) => {
                self.suggestions.insert(
                    dimension_id.to_string(),
                    SuggestionSlot {
                        text,
                        pending: false,
                    },
                );
                Ok(())
            }
            Err(err) => {
                self.suggestions.remove(dimension_id);
                warn!(
                    "event=ai_suggestion module=capture status=error dimension_id={dimension_id} error_code={}",
                    err.code()
                );
                Err(err)
            }
        }
    }

    /// Requests and stores a suggestion for the active dimension.
    ///
    /// Returns `Ok(false)` without calling the gateway when a request for the
    /// dimension is already pending.
    pub async fn request_ai_suggestion<G: AiGateway + ?Sized>(
        &mut self,
        gateway: &G,
    ) -> GatewayResult<bool> {
        let Some(request) = self.begin_suggestion() else {
            return Ok(false);
        };
        let result = gateway
            .generate_suggestion(&request.dimension, &request.scores)
            .await;
        self.complete_suggestion(&request.dimension.id, result)?;
        Ok(true)
    }

    // Evidence.

    pub fn is_evidence_pending(&self, criterion_id: &str) -> bool {
        self.pending_evidence.contains(criterion_id)
    }

    /// Marks an evidence request for `criterion_id` as pending.
    ///
    /// Returns `Ok(None)` while another evidence request for that criterion
    /// is still pending.
    pub fn begin_evidence(
        &mut self,
        criterion_id: &str,
        kind: EvidenceKind,
    ) -> Result<Option<EvidenceRequest>, ValidationError> {
        self.ensure_criterion(criterion_id)?;
        if !self.pending_evidence.insert(criterion_id.to_string()) {
            return Ok(None);
        }
        Ok(Some(EvidenceRequest {
            criterion_id: criterion_id.to_string(),
            kind,
        }))
    }

    /// Appends an evidence result to the criterion's notes and clears the
    /// pending mark. Failures leave notes untouched.
    pub fn apply_evidence(
        &mut self,
        request: &EvidenceRequest,
        result: GatewayResult<String>,
    ) -> GatewayResult<()> {
        self.pending_evidence.remove(&request.criterion_id);
        let text = match result {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    "event=ai_evidence module=capture status=error kind={} criterion_id={} error_code={}",
                    request.kind.as_str(),
                    request.criterion_id,
                    err.code()
                );
                return Err(err);
            }
        };

        let entry = self
            .draft_scores
            .entry(request.criterion_id.clone())
            .or_insert_with(|| ObservationScore::empty(request.criterion_id.as_str()));
        entry.notes = append_evidence(&entry.notes, request.kind, &text);
        Ok(())
    }

    /// Analyzes an image and appends the description to the criterion notes.
    ///
    /// Returns `Ok(false)` when evidence for the criterion is already pending.
    pub async fn attach_image<G: AiGateway + ?Sized>(
        &mut self,
        criterion_id: &str,
        image: &[u8],
        gateway: &G,
    ) -> Result<bool, CaptureError> {
        let Some(request) = self.begin_evidence(criterion_id, EvidenceKind::Image)? else {
            return Ok(false);
        };
        let result = gateway.analyze_image(image).await;
        self.apply_evidence(&request, result)?;
        Ok(true)
    }

    /// Transcribes an audio clip and appends the text to the criterion notes.
    ///
    /// Returns `Ok(false)` when evidence for the criterion is already pending.
    pub async fn attach_audio_clip<G: AiGateway + ?Sized>(
        &mut self,
        criterion_id: &str,
        audio: &[u8],
        gateway: &G,
    ) -> Result<bool, CaptureError> {
        let Some(request) = self.begin_evidence(criterion_id, EvidenceKind::Audio)? else {
            return Ok(false);
        };
        let result = gateway.transcribe_audio(audio).await;
        self.apply_evidence(&request, result)?;
        Ok(true)
    }

    // Finalization.

    /// Finalizes the draft using the current time.
    pub fn submit(&self) -> Result<TeacherObservation, ValidationError> {
        self.submit_at(Utc::now())
    }

    /// Finalizes the draft with an explicit timestamp.
    ///
    /// # Errors
    /// - `MissingField` when teacher or school name is blank.
    ///
    /// Entries with neither score nor notes are dropped; partially scored
    /// drafts are accepted.
    pub fn submit_at(&self, now: DateTime<Utc>) -> Result<TeacherObservation, ValidationError> {
        let teacher_name = self.basic_info.teacher_name.trim();
        let school_name = self.basic_info.school_name.trim();
        let missing = if teacher_name.is_empty() {
            Some(BasicInfoField::TeacherName)
        } else if school_name.is_empty() {
            Some(BasicInfoField::SchoolName)
        } else {
            None
        };
        if let Some(field) = missing {
            warn!(
                "event=observation_submit module=capture status=error error_code=missing_field field={}",
                field.as_str()
            );
            return Err(ValidationError::MissingField(field));
        }

        let scores = self
            .draft_scores
            .iter()
            .filter(|(_, entry)| entry.score.is_some() || !entry.notes.trim().is_empty())
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect::<BTreeMap<_, _>>();

        let observation = TeacherObservation {
            id: ObservationId::generate(),
            teacher_name: teacher_name.to_string(),
            school_name: school_name.to_string(),
            observer_name: self.basic_info.observer_name.trim().to_string(),
            date: now,
            scores,
            general_notes: self.general_notes.clone(),
        };

        info!(
            "event=observation_submit module=capture status=ok observation_id={} scored={} entries={}",
            observation.id,
            observation
                .scores
                .values()
                .filter(|entry| entry.score.is_some())
                .count(),
            observation.scores.len()
        );
        Ok(observation)
    }
}

#[cfg(test)]
mod tests {
    use super::{append_evidence, EvidenceKind};

    #[test]
    fn image_evidence_goes_on_labelled_new_line() {
        assert_eq!(
            append_evidence("foo", EvidenceKind::Image, "bar"),
            "foo\n[Análisis de Imagen]: bar"
        );
    }

    #[test]
    fn audio_evidence_joins_with_space() {
        assert_eq!(append_evidence("foo", EvidenceKind::Audio, " bar "), "foo bar");
    }

    #[test]
    fn evidence_on_empty_notes_has_no_leading_separator() {
        assert_eq!(
            append_evidence("", EvidenceKind::Image, "bar"),
            "[Análisis de Imagen]: bar"
        );
        assert_eq!(append_evidence("", EvidenceKind::Audio, "dijo"), "dijo");
    }

    #[test]
    fn blank_evidence_keeps_notes() {
        assert_eq!(append_evidence("foo", EvidenceKind::Audio, "   "), "foo");
    }
}
