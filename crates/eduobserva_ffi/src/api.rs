//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose use-case level functions (rubric, capture, evidence, history,
//!   dashboard, report, read-aloud, assistant chat) to Dart via FRB.
//! - Translate core errors into response envelopes with user-facing text.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Every call opens its own database connection; no connection is shared
//!   between calls.
//! - AI calls run to completion on a private current-thread runtime.

use eduobserva_core::db::open_db;
use eduobserva_core::service::capture::{EvidenceKind, ValidationError};
use eduobserva_core::service::scoring::rounded_one_decimal;
use eduobserva_core::{
    core_version as core_version_inner, default_log_level as default_log_level_inner,
    init_logging as init_logging_inner, logging_status as logging_status_inner,
    ping as ping_inner, reference_rubric, AiGateway, CaptureError, CaptureWorkflow, ChatMessage, ChatRole, ChatSession, DashboardSummary,
    GatewayConfig, GeminiGateway, ObservationId, RecordStore, ReportSection, ReportService,
    SendOutcome, SourceLink, SqliteKeyValueStore, StorageResult, TeacherObservation,
};
use log::warn;
use std::future::Future;
use std::path::PathBuf;
use std::sync::OnceLock;

const DB_PATH_ENV: &str = "EDUOBSERVA_DB_PATH";
const DB_FILE_NAME: &str = "eduobserva.sqlite3";
const STORAGE_FAILURE_MESSAGE: &str = "No se pudo guardar la observación.";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Idempotent for the same `level + log_dir`; conflicting calls fail.
/// - Returns an empty string on success and the error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Returns the log level to pass to `init_logging` by default.
#[flutter_rust_bridge::frb(sync)]
pub fn log_default_level() -> String {
    default_log_level_inner().to_owned()
}

/// Active logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingStatus {
    pub active: bool,
    pub level: String,
    pub log_dir: String,
}

/// Reports whether logging is active and where it writes.
#[flutter_rust_bridge::frb(sync)]
pub fn log_status() -> LoggingStatus {
    match logging_status_inner() {
        Some((level, log_dir)) => LoggingStatus {
            active: true,
            level: level.to_string(),
            log_dir: log_dir.display().to_string(),
        },
        None => LoggingStatus {
            active: false,
            level: String::new(),
            log_dir: String::new(),
        },
    }
}

/// Rubric criterion as shown on the capture form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionItem {
    pub id: String,
    pub label: String,
    pub description: String,
}

/// Rubric dimension with its criteria, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionItem {
    pub id: String,
    pub title: String,
    /// Icon token for the UI.
    pub icon: String,
    pub criteria: Vec<CriterionItem>,
}

/// Returns the reference rubric.
#[flutter_rust_bridge::frb(sync)]
pub fn rubric_dimensions() -> Vec<DimensionItem> {
    reference_rubric()
        .dimensions()
        .iter()
        .map(|dimension| DimensionItem {
            id: dimension.id.clone(),
            title: dimension.title.clone(),
            icon: dimension.icon.clone(),
            criteria: dimension
                .criteria
                .iter()
                .map(|criterion| CriterionItem {
                    id: criterion.id.clone(),
                    label: criterion.label.clone(),
                    description: criterion.description.clone(),
                })
                .collect(),
        })
        .collect()
}

/// Score and notes for one criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreItem {
    pub criterion_id: String,
    /// `1..=5`, or `None` when unscored.
    pub score: Option<u8>,
    pub notes: String,
}

/// Stored observation projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationItem {
    pub id: String,
    pub teacher_name: String,
    pub school_name: String,
    pub observer_name: String,
    /// RFC 3339 timestamp.
    pub date: String,
    pub scores: Vec<ScoreItem>,
    pub general_notes: String,
}

/// History response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationListResponse {
    /// Newest first.
    pub items: Vec<ObservationItem>,
    /// `true` when stored history existed but could not be read.
    pub degraded: bool,
    pub message: String,
}

/// Lists stored observations, newest first.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Unreadable history yields an empty list with `degraded = true`.
#[flutter_rust_bridge::frb(sync)]
pub fn observations_list() -> ObservationListResponse {
    match with_record_store(|store| Ok(store_snapshot(store))) {
        Ok((observations, degraded)) => ObservationListResponse {
            message: if degraded {
                "El historial guardado no se pudo leer.".to_string()
            } else {
                format!("{} observación(es).", observations.len())
            },
            items: observations.iter().map(to_observation_item).collect(),
            degraded,
        },
        Err(message) => ObservationListResponse {
            items: Vec::new(),
            degraded: true,
            message,
        },
    }
}

/// Capture form contents submitted from the UI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservationDraft {
    pub teacher_name: String,
    pub school_name: String,
    pub observer_name: String,
    pub general_notes: String,
    pub scores: Vec<ScoreItem>,
}

/// Action response envelope for observation submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationActionResponse {
    pub ok: bool,
    pub observation_id: Option<String>,
    pub message: String,
}

impl ObservationActionResponse {
    fn success(observation_id: &ObservationId) -> Self {
        Self {
            ok: true,
            observation_id: Some(observation_id.to_string()),
            message: "Observación guardada.".to_string(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            observation_id: None,
            message: message.into(),
        }
    }
}

/// Validates a draft, finalizes it and appends it to history.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Validation and storage failures return `ok = false` and leave history
///   unchanged.
#[flutter_rust_bridge::frb(sync)]
pub fn observation_submit(draft: ObservationDraft) -> ObservationActionResponse {
    let observation = match finalize_draft(&draft) {
        Ok(observation) => observation,
        Err(err) => return ObservationActionResponse::failure(validation_message(&err)),
    };

    let id = observation.id.clone();
    match with_record_store(|store| store.append(observation).map(|_| ())) {
        Ok(()) => ObservationActionResponse::success(&id),
        Err(message) => ObservationActionResponse::failure(message),
    }
}

/// Dashboard bar for one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionAverageItem {
    pub dimension_id: String,
    pub title: String,
    /// Rounded to one decimal.
    pub average: f64,
    pub sample_count: u32,
}

/// Dashboard response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardResponse {
    pub observation_count: u32,
    pub school_count: u32,
    /// Rounded to one decimal.
    pub overall_average: f64,
    pub dimensions: Vec<DimensionAverageItem>,
    pub message: String,
}

/// Aggregates stored history for the dashboard.
#[flutter_rust_bridge::frb(sync)]
pub fn dashboard_summary() -> DashboardResponse {
    let (observations, message) = match with_record_store(|store| Ok(store_snapshot(store))) {
        Ok((observations, _)) => (observations, String::new()),
        Err(message) => (Vec::new(), message),
    };
    let summary = DashboardSummary::compute(&observations, reference_rubric());
    DashboardResponse {
        observation_count: summary.observation_count as u32,
        school_count: summary.school_count as u32,
        overall_average: rounded_one_decimal(summary.overall_average),
        dimensions: summary
            .dimensions
            .into_iter()
            .map(|entry| DimensionAverageItem {
                dimension_id: entry.dimension_id,
                title: entry.dimension_title,
                average: rounded_one_decimal(entry.average),
                sample_count: entry.sample_count,
            })
            .collect(),
        message,
    }
}

/// One report section in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSectionItem {
    pub key: String,
    pub title: String,
    pub text: String,
}

/// Report response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportResponse {
    pub ok: bool,
    pub sections: Vec<ReportSectionItem>,
    pub message: String,
}

/// Generates the AI report for a stored observation.
///
/// # FFI contract
/// - Blocks until the AI call finishes or times out.
/// - Failures return `ok = false` with the user-facing message.
#[flutter_rust_bridge::frb(sync)]
pub fn report_generate(observation_id: String) -> ReportResponse {
    let failure = |message: String| ReportResponse {
        ok: false,
        sections: Vec::new(),
        message,
    };

    let id = ObservationId::from(observation_id.trim());
    let observation = match with_record_store(|store| Ok(store.get(&id).cloned())) {
        Ok(Some(observation)) => observation,
        Ok(None) => return failure("Observación no encontrada.".to_string()),
        Err(message) => return failure(message),
    };
    let gateway = match GeminiGateway::new(GatewayConfig::from_env()) {
        Ok(gateway) => gateway,
        Err(err) => return failure(err.user_message().to_string()),
    };

    let service = ReportService::new(&gateway, reference_rubric());
    match block_on(service.generate(&observation)) {
        Ok(Ok(report)) => ReportResponse {
            ok: true,
            sections: ReportSection::ALL
                .iter()
                .map(|section| ReportSectionItem {
                    key: section.key().to_string(),
                    title: section.title().to_string(),
                    text: report.section(*section).to_string(),
                })
                .collect(),
            message: String::new(),
        },
        Ok(Err(err)) => failure(err.user_message().to_string()),
        Err(message) => failure(message),
    }
}

/// Text result of a single AI call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiTextResponse {
    pub ok: bool,
    pub text: String,
    pub message: String,
}

impl AiTextResponse {
    fn success(text: String) -> Self {
        Self {
            ok: true,
            text,
            message: String::new(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            text: String::new(),
            message: message.into(),
        }
    }
}

/// Requests an improvement suggestion for one dimension from draft scores.
///
/// # FFI contract
/// - Blocks until the AI call finishes or times out.
/// - Unknown dimension or criterion ids and out-of-range scores fail
///   without calling the AI.
#[flutter_rust_bridge::frb(sync)]
pub fn dimension_suggest(dimension_id: String, scores: Vec<ScoreItem>) -> AiTextResponse {
    let rubric = reference_rubric();
    let Some(index) = rubric
        .dimensions()
        .iter()
        .position(|dimension| dimension.id == dimension_id.trim())
    else {
        return AiTextResponse::failure("Dimensión no encontrada.");
    };

    let mut workflow = CaptureWorkflow::new(rubric);
    if let Err(err) = apply_score_items(&mut workflow, &scores) {
        return AiTextResponse::failure(validation_message(&err));
    }
    workflow.go_to(index);
    let dimension_id = workflow.active_dimension().id.as_str();

    let result = with_gateway(|gateway| {
        block_on(workflow.request_ai_suggestion(gateway))?
            .map_err(|err| err.user_message().to_string())
    });
    match result {
        Ok(_) => AiTextResponse::success(
            workflow
                .suggestion(dimension_id)
                .map(|slot| slot.text.clone())
                .unwrap_or_default(),
        ),
        Err(message) => AiTextResponse::failure(message),
    }
}

/// Analyzes a JPEG photo and returns the criterion notes with the
/// description appended.
///
/// # FFI contract
/// - Blocks until the AI call finishes or times out.
/// - On failure `text` is empty and the caller keeps its notes.
#[flutter_rust_bridge::frb(sync)]
pub fn evidence_analyze_image(
    criterion_id: String,
    current_notes: String,
    image: Vec<u8>,
) -> AiTextResponse {
    attach_evidence(&criterion_id, current_notes, EvidenceKind::Image, &image)
}

/// Transcribes a WAV clip and returns the criterion notes with the
/// transcription appended.
#[flutter_rust_bridge::frb(sync)]
pub fn evidence_transcribe(
    criterion_id: String,
    current_notes: String,
    audio: Vec<u8>,
) -> AiTextResponse {
    attach_evidence(&criterion_id, current_notes, EvidenceKind::Audio, &audio)
}

/// Synthesized speech for read-aloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechResponse {
    pub ok: bool,
    /// Mono 16-bit samples.
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub duration_ms: u64,
    pub message: String,
}

/// Synthesizes `text` (typically one report section) for playback.
///
/// # FFI contract
/// - Blocks until the AI call finishes or times out.
/// - Blank text fails without calling the AI.
#[flutter_rust_bridge::frb(sync)]
pub fn report_speak(text: String) -> SpeechResponse {
    let failure = |message: String| SpeechResponse {
        ok: false,
        samples: Vec::new(),
        sample_rate: 0,
        duration_ms: 0,
        message,
    };
    if text.trim().is_empty() {
        return failure("No hay texto para leer.".to_string());
    }

    let result = with_gateway(|gateway| {
        block_on(gateway.speak(text.trim()))?.map_err(|err| err.user_message().to_string())
    });
    match result {
        Ok(clip) => SpeechResponse {
            ok: true,
            samples: clip.samples(),
            sample_rate: clip.sample_rate,
            duration_ms: clip.duration_ms(),
            message: String::new(),
        },
        Err(message) => failure(message),
    }
}

/// Web source cited by an assistant answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    pub title: String,
    pub uri: String,
}

/// One chat turn. `role` is `user` or `model`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: String,
    pub text: String,
    pub sources: Vec<SourceItem>,
}

/// Chat response envelope carrying the full updated transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    /// `replied|apologized|ignored_blank|busy`.
    pub outcome: String,
    pub messages: Vec<ChatTurn>,
}

/// Sends one assistant message given the transcript held by the UI.
///
/// # FFI contract
/// - Blocks until the AI call finishes or times out.
/// - Blank input returns the transcript unchanged.
/// - Failures append the apology turn instead of erroring.
#[flutter_rust_bridge::frb(sync)]
pub fn chat_ask(message: String, history: Vec<ChatTurn>) -> ChatResponse {
    let mut session = ChatSession::with_history(history.into_iter().map(from_chat_turn).collect());
    let outcome = if message.trim().is_empty() {
        SendOutcome::IgnoredBlank
    } else {
        match GeminiGateway::new(GatewayConfig::from_env()) {
            Ok(gateway) => match block_on(session.send(&gateway, &message)) {
                Ok(outcome) => outcome,
                Err(_) => apologize(&mut session, &message),
            },
            Err(err) => {
                warn!(
                    "event=chat_reply module=ffi status=error error_code={}",
                    err.code()
                );
                apologize(&mut session, &message)
            }
        }
    };

    ChatResponse {
        outcome: outcome_label(outcome).to_string(),
        messages: session.messages().iter().map(to_chat_turn).collect(),
    }
}

/// Records a failed turn without reaching the gateway.
fn apologize(session: &mut ChatSession, message: &str) -> SendOutcome {
    match session.begin_send(message) {
        Ok(_) => session.complete_send(None),
        Err(outcome) => outcome,
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn with_record_store<T>(
    f: impl FnOnce(&mut RecordStore<SqliteKeyValueStore<'_>>) -> StorageResult<T>,
) -> Result<T, String> {
    let db_path = resolve_db_path();
    let conn = open_db(&db_path).map_err(|err| {
        warn!("event=db_open module=ffi status=error error={err}");
        STORAGE_FAILURE_MESSAGE.to_string()
    })?;
    let kv = SqliteKeyValueStore::try_new(&conn).map_err(|err| {
        warn!("event=store_init module=ffi status=error error={err}");
        STORAGE_FAILURE_MESSAGE.to_string()
    })?;
    let mut store = RecordStore::open(kv);
    f(&mut store).map_err(|err| {
        warn!("event=store_call module=ffi status=error error={err}");
        STORAGE_FAILURE_MESSAGE.to_string()
    })
}

fn store_snapshot(store: &RecordStore<SqliteKeyValueStore<'_>>) -> (Vec<TeacherObservation>, bool) {
    (
        store.observations().to_vec(),
        store.load_status().is_degraded(),
    )
}

fn finalize_draft(draft: &ObservationDraft) -> Result<TeacherObservation, ValidationError> {
    let mut workflow = CaptureWorkflow::new(reference_rubric());
    workflow.set_teacher_name(draft.teacher_name.as_str());
    workflow.set_school_name(draft.school_name.as_str());
    workflow.set_observer_name(draft.observer_name.as_str());
    workflow.set_general_notes(draft.general_notes.as_str());
    apply_score_items(&mut workflow, &draft.scores)?;
    workflow.submit()
}

/// Applies items in order; a later item for the same criterion replaces
/// both score and notes of an earlier one.
fn apply_score_items(
    workflow: &mut CaptureWorkflow<'_>,
    items: &[ScoreItem],
) -> Result<(), ValidationError> {
    for item in items {
        workflow.set_notes(&item.criterion_id, item.notes.as_str())?;
        match item.score {
            Some(score) => workflow.set_score(&item.criterion_id, score)?,
            None => workflow.clear_score(&item.criterion_id)?,
        }
    }
    Ok(())
}

fn attach_evidence(
    criterion_id: &str,
    current_notes: String,
    kind: EvidenceKind,
    bytes: &[u8],
) -> AiTextResponse {
    let criterion_id = criterion_id.trim();
    let mut workflow = CaptureWorkflow::new(reference_rubric());
    if let Err(err) = workflow.set_notes(criterion_id, current_notes) {
        return AiTextResponse::failure(validation_message(&err));
    }

    let result = with_gateway(|gateway| {
        let attached = match kind {
            EvidenceKind::Image => block_on(workflow.attach_image(criterion_id, bytes, gateway))?,
            EvidenceKind::Audio => {
                block_on(workflow.attach_audio_clip(criterion_id, bytes, gateway))?
            }
        };
        attached.map_err(|err| capture_message(&err))
    });
    match result {
        Ok(_) => AiTextResponse::success(
            workflow
                .score_entry(criterion_id)
                .map(|entry| entry.notes.clone())
                .unwrap_or_default(),
        ),
        Err(message) => AiTextResponse::failure(message),
    }
}

fn capture_message(err: &CaptureError) -> String {
    match err {
        CaptureError::Validation(err) => validation_message(err),
        CaptureError::Gateway(err) => err.user_message().to_string(),
    }
}

fn with_gateway<T>(f: impl FnOnce(&GeminiGateway) -> Result<T, String>) -> Result<T, String> {
    let gateway = GeminiGateway::new(GatewayConfig::from_env())
        .map_err(|err| err.user_message().to_string())?;
    f(&gateway)
}

fn validation_message(err: &ValidationError) -> String {
    match err {
        ValidationError::MissingField(_) => {
            "Completa el nombre del docente y de la institución.".to_string()
        }
        other => other.to_string(),
    }
}

fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            warn!("event=runtime_build module=ffi status=error error={err}");
            "Error al conectar con la IA.".to_string()
        })?;
    Ok(runtime.block_on(future))
}

fn to_observation_item(observation: &TeacherObservation) -> ObservationItem {
    ObservationItem {
        id: observation.id.to_string(),
        teacher_name: observation.teacher_name.clone(),
        school_name: observation.school_name.clone(),
        observer_name: observation.observer_name.clone(),
        date: observation.date.to_rfc3339(),
        scores: observation
            .scores
            .values()
            .map(|entry| ScoreItem {
                criterion_id: entry.criterion_id.clone(),
                score: entry.score.map(|score| score.value()),
                notes: entry.notes.clone(),
            })
            .collect(),
        general_notes: observation.general_notes.clone(),
    }
}

fn from_chat_turn(turn: ChatTurn) -> ChatMessage {
    let role = if turn.role.eq_ignore_ascii_case("user") {
        ChatRole::User
    } else {
        ChatRole::Model
    };
    ChatMessage {
        role,
        text: turn.text,
        source_links: turn
            .sources
            .into_iter()
            .map(|source| SourceLink {
                title: source.title,
                uri: source.uri,
            })
            .collect(),
    }
}

fn to_chat_turn(message: &ChatMessage) -> ChatTurn {
    ChatTurn {
        role: message.role.as_str().to_string(),
        text: message.text.clone(),
        sources: message
            .source_links
            .iter()
            .map(|link| SourceItem {
                title: link.title.clone(),
                uri: link.uri.clone(),
            })
            .collect(),
    }
}

fn outcome_label(outcome: SendOutcome) -> &'static str {
    match outcome {
        SendOutcome::Replied => "replied",
        SendOutcome::Apologized => "apologized",
        SendOutcome::IgnoredBlank => "ignored_blank",
        SendOutcome::Busy => "busy",
    }
}

#[cfg(test)]
mod tests {
    use super::{
        chat_ask, core_version, dashboard_summary, dimension_suggest, evidence_analyze_image,
        evidence_transcribe, finalize_draft, init_logging, log_default_level, log_status,
        observation_submit, observations_list, ping, report_generate, report_speak,
        rubric_dimensions, ChatTurn, ObservationDraft, ScoreItem,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn rubric_dimensions_lists_reference_rubric() {
        let dimensions = rubric_dimensions();
        assert_eq!(dimensions.len(), 9);
        assert_eq!(dimensions[0].id, "planeacion");
        assert!(dimensions.iter().all(|dimension| dimension.criteria.len() == 4));
    }

    #[test]
    fn observation_submit_rejects_missing_names() {
        let response = observation_submit(ObservationDraft {
            teacher_name: "  ".to_string(),
            school_name: "Escuela".to_string(),
            ..ObservationDraft::default()
        });
        assert!(!response.ok);
        assert!(response.observation_id.is_none());
    }

    #[test]
    fn observation_submit_rejects_invalid_score() {
        let response = observation_submit(ObservationDraft {
            teacher_name: "Ana".to_string(),
            school_name: "Escuela".to_string(),
            scores: vec![ScoreItem {
                criterion_id: "p1".to_string(),
                score: Some(9),
                notes: String::new(),
            }],
            ..ObservationDraft::default()
        });
        assert!(!response.ok);
    }

    #[test]
    fn submitted_observation_appears_in_history_and_dashboard() {
        let teacher = unique_token("docente");
        let response = observation_submit(ObservationDraft {
            teacher_name: teacher.clone(),
            school_name: "Escuela Norte".to_string(),
            observer_name: "Luis".to_string(),
            general_notes: String::new(),
            scores: vec![ScoreItem {
                criterion_id: "p1".to_string(),
                score: Some(4),
                notes: "Buen cierre".to_string(),
            }],
        });
        assert!(response.ok, "{}", response.message);
        let id = response.observation_id.expect("submit returns id");

        let list = observations_list();
        let item = list
            .items
            .iter()
            .find(|item| item.id == id)
            .expect("submitted observation is listed");
        assert_eq!(item.teacher_name, teacher);
        assert_eq!(item.scores[0].score, Some(4));

        let dashboard = dashboard_summary();
        assert!(dashboard.observation_count >= 1);
        assert_eq!(dashboard.dimensions.len(), 9);
        assert!(dashboard.dimensions[0].sample_count >= 1);
    }

    #[test]
    fn report_generate_rejects_unknown_observation() {
        let response = report_generate(unique_token("missing"));
        assert!(!response.ok);
        assert!(response.sections.is_empty());
    }

    #[test]
    fn chat_ask_ignores_blank_message() {
        let history = vec![ChatTurn {
            role: "user".to_string(),
            text: "hola".to_string(),
            sources: Vec::new(),
        }];
        let response = chat_ask("   ".to_string(), history);
        assert_eq!(response.outcome, "ignored_blank");
        assert_eq!(response.messages.len(), 2);
        assert_eq!(response.messages[0].role, "model");
    }

    #[test]
    fn default_log_level_and_status_are_consistent() {
        let level = log_default_level();
        assert!(level == "debug" || level == "info");

        let status = log_status();
        if !status.active {
            assert!(status.level.is_empty());
            assert!(status.log_dir.is_empty());
        }
    }

    #[test]
    fn later_unscored_item_clears_earlier_score() {
        let draft = ObservationDraft {
            teacher_name: "Ana".to_string(),
            school_name: "Escuela".to_string(),
            scores: vec![
                score_item("p1", Some(5), ""),
                score_item("p1", None, "solo notas"),
            ],
            ..ObservationDraft::default()
        };

        let observation = finalize_draft(&draft).expect("draft is valid");
        let entry = observation.scores.get("p1").expect("notes keep the entry");
        assert_eq!(entry.score, None);
        assert_eq!(entry.notes, "solo notas");
    }

    #[test]
    fn dashboard_averages_are_rounded_to_one_decimal() {
        for (teacher, score) in [("a", 5), ("b", 4), ("c", 4)] {
            let response = observation_submit(ObservationDraft {
                teacher_name: unique_token(teacher),
                school_name: "Escuela Sur".to_string(),
                scores: vec![score_item("p1", Some(score), "")],
                ..ObservationDraft::default()
            });
            assert!(response.ok, "{}", response.message);
        }

        let dashboard = dashboard_summary();
        let is_one_decimal = |value: f64| ((value * 10.0).round() / 10.0 - value).abs() < 1e-9;
        assert!(is_one_decimal(dashboard.overall_average));
        assert!(dashboard
            .dimensions
            .iter()
            .all(|dimension| is_one_decimal(dimension.average)));
    }

    #[test]
    fn dimension_suggest_rejects_unknown_dimension() {
        let response = dimension_suggest("inexistente".to_string(), Vec::new());
        assert!(!response.ok);
        assert!(response.text.is_empty());
        assert!(!response.message.is_empty());
    }

    #[test]
    fn dimension_suggest_rejects_invalid_draft_scores() {
        let response = dimension_suggest(
            "planeacion".to_string(),
            vec![score_item("p1", Some(9), "")],
        );
        assert!(!response.ok);
        assert!(response.message.contains('9'));

        let response = dimension_suggest(
            "planeacion".to_string(),
            vec![score_item("zz9", Some(3), "")],
        );
        assert!(!response.ok);
        assert!(response.message.contains("zz9"));
    }

    #[test]
    fn evidence_calls_reject_unknown_criterion() {
        let image = evidence_analyze_image("zz9".to_string(), "previo".to_string(), vec![0xFF]);
        assert!(!image.ok);
        assert!(image.text.is_empty());
        assert!(image.message.contains("zz9"));

        let audio = evidence_transcribe("zz9".to_string(), String::new(), vec![0x52]);
        assert!(!audio.ok);
        assert!(audio.message.contains("zz9"));
    }

    #[test]
    fn report_speak_rejects_blank_text() {
        let response = report_speak("  \n ".to_string());
        assert!(!response.ok);
        assert!(response.samples.is_empty());
        assert_eq!(response.sample_rate, 0);
        assert_eq!(response.duration_ms, 0);
        assert!(!response.message.is_empty());
    }

    fn score_item(criterion_id: &str, score: Option<u8>, notes: &str) -> ScoreItem {
        ScoreItem {
            criterion_id: criterion_id.to_string(),
            score,
            notes: notes.to_string(),
        }
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
