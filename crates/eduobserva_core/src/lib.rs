//! Core domain logic for EduObserva.
//! This crate is the single source of truth for observation invariants.

pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::GatewayConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use gateway::{AiGateway, GatewayError, GatewayResult, GeminiGateway};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::chat::{ChatMessage, ChatReply, ChatRole, SourceLink, SpeechClip};
pub use model::observation::{ObservationId, ObservationScore, Score, TeacherObservation};
pub use model::report::{AiReport, ReportSection};
pub use model::rubric::{list_dimensions, reference_rubric, Criterion, Dimension, Rubric};
pub use repo::kv_store::{
    KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StorageError, StorageResult,
};
pub use repo::record_store::{LoadStatus, RecordStore};
pub use service::capture::{CaptureError, CaptureWorkflow, EvidenceKind, ValidationError};
pub use service::chat_service::{ChatSession, SendOutcome};
pub use service::report_service::ReportService;
pub use service::scoring::{aggregate, overall_average, DashboardSummary, DimensionAverage};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
