//! Narrative report use-case.
//!
//! # Responsibility
//! - Request the four-section AI report for one stored observation.
//! - Record outcome and latency as metadata-only log events.

use crate::gateway::{AiGateway, GatewayResult};
use crate::model::observation::TeacherObservation;
use crate::model::report::AiReport;
use crate::model::rubric::Rubric;
use log::{info, warn};
use std::time::Instant;

/// Report generation bound to one gateway and rubric.
pub struct ReportService<'a, G: AiGateway + ?Sized> {
    gateway: &'a G,
    rubric: &'a Rubric,
}

impl<'a, G: AiGateway + ?Sized> ReportService<'a, G> {
    pub fn new(gateway: &'a G, rubric: &'a Rubric) -> Self {
        Self { gateway, rubric }
    }

    /// Generates the report for `observation`.
    ///
    /// Failures are returned unchanged; callers render
    /// `GatewayError::user_message()` in the report area.
    pub async fn generate(&self, observation: &TeacherObservation) -> GatewayResult<AiReport> {
        let started = Instant::now();
        info!(
            "event=report_generate module=report status=start observation_id={}",
            observation.id
        );

        let result = self.gateway.generate_report(observation, self.rubric).await;
        let duration_ms = started.elapsed().as_millis();
        match &result {
            Ok(_) => info!(
                "event=report_generate module=report status=ok observation_id={} duration_ms={duration_ms}",
                observation.id
            ),
            Err(err) => warn!(
                "event=report_generate module=report status=error observation_id={} error_code={} duration_ms={duration_ms}",
                observation.id,
                err.code()
            ),
        }
        result
    }
}
