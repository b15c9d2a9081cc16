//! Observation record store.
//!
//! # Responsibility
//! - Own the ordered list of finalized observations (newest first).
//! - Persist the whole list as one versioned JSON blob under a single key.
//!
//! # Invariants
//! - `append` prepends and writes the full updated list in one `put`; the
//!   in-memory list only changes after that write succeeds.
//! - Loading never fails the caller: missing, unreadable, corrupt or too-new
//!   blobs degrade to an empty history and are reported via `load_status()`.
//! - `decode_observations(encode_observations(x)) == x` for every list.
//! - A blob that failed to load is copied under a backup key before the
//!   first write replaces it; if that copy fails, nothing is written.
//!
//! # Wire format
//! - Current: `{"version": 1, "observations": [...]}`.
//! - Legacy (version 0): a bare JSON array of observations.

use crate::model::observation::{ObservationId, TeacherObservation};
use crate::repo::kv_store::{KeyValueStore, StorageResult};
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage key holding the observation blob.
pub const OBSERVATIONS_KEY: &str = "edu_observations";
/// Prefix of keys holding blobs that could not be loaded.
pub const UNREADABLE_BACKUP_PREFIX: &str = "edu_observations.unreadable.";
/// Latest blob format version written by this binary.
pub const STORAGE_FORMAT_VERSION: u32 = 1;

/// Outcome of the most recent load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Nothing loaded yet.
    NotLoaded,
    /// No blob stored under the key.
    Missing,
    /// Blob decoded successfully.
    Loaded { format_version: u32, count: usize },
    /// The storage backend failed to read.
    Unreadable,
    /// Blob exists but does not decode.
    Corrupt,
    /// Blob was written by a newer format version.
    UnsupportedVersion { found: u64 },
}

impl LoadStatus {
    /// Returns whether stored history was discarded on load.
    pub fn is_degraded(self) -> bool {
        matches!(
            self,
            Self::Unreadable | Self::Corrupt | Self::UnsupportedVersion { .. }
        )
    }
}

/// Blob decode failures.
#[derive(Debug)]
pub enum DecodeError {
    Json(serde_json::Error),
    UnsupportedVersion(u64),
    UnexpectedShape,
}

impl DecodeError {
    /// Stable, content-free code for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Json(_) => "invalid_json",
            Self::UnsupportedVersion(_) => "unsupported_version",
            Self::UnexpectedShape => "unexpected_shape",
        }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid observation blob: {err}"),
            Self::UnsupportedVersion(found) => write!(
                f,
                "observation blob version {found} is newer than supported {STORAGE_FORMAT_VERSION}"
            ),
            Self::UnexpectedShape => {
                write!(f, "observation blob is neither a versioned envelope nor a list")
            }
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    observations: &'a [TeacherObservation],
}

/// Serializes observations into the current versioned envelope.
pub fn encode_observations(observations: &[TeacherObservation]) -> serde_json::Result<String> {
    serde_json::to_string(&Envelope {
        version: STORAGE_FORMAT_VERSION,
        observations,
    })
}

/// Parses a stored blob, accepting the current envelope and the legacy list.
///
/// Returns the observations together with the format version they were
/// stored in.
pub fn decode_observations(raw: &str) -> Result<(u32, Vec<TeacherObservation>), DecodeError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(items) => {
            let observations = serde_json::from_value(Value::Array(items))?;
            Ok((0, observations))
        }
        Value::Object(mut map) => {
            let version = map
                .get("version")
                .and_then(Value::as_u64)
                .ok_or(DecodeError::UnexpectedShape)?;
            if version > u64::from(STORAGE_FORMAT_VERSION) {
                return Err(DecodeError::UnsupportedVersion(version));
            }
            let observations = map
                .remove("observations")
                .ok_or(DecodeError::UnexpectedShape)?;
            // Bounded by the check above.
            Ok((version as u32, serde_json::from_value(observations)?))
        }
        _ => Err(DecodeError::UnexpectedShape),
    }
}

/// Ordered observation history bound to one key-value store.
pub struct RecordStore<S: KeyValueStore> {
    store: S,
    observations: Vec<TeacherObservation>,
    load_status: LoadStatus,
    backup_key: Option<String>,
}

impl<S: KeyValueStore> RecordStore<S> {
    /// Creates a store and immediately loads persisted history.
    pub fn open(store: S) -> Self {
        let mut record_store = Self {
            store,
            observations: Vec::new(),
            load_status: LoadStatus::NotLoaded,
            backup_key: None,
        };
        record_store.load();
        record_store
    }

    /// Re-reads persisted history, replacing the in-memory list.
    ///
    /// Never fails; see `load_status()` for why a load came back empty.
    pub fn load(&mut self) -> &[TeacherObservation] {
        let (status, observations) = match self.store.get(OBSERVATIONS_KEY) {
            Ok(None) => (LoadStatus::Missing, Vec::new()),
            Ok(Some(raw)) => match decode_observations(&raw) {
                Ok((format_version, observations)) => (
                    LoadStatus::Loaded {
                        format_version,
                        count: observations.len(),
                    },
                    observations,
                ),
                Err(DecodeError::UnsupportedVersion(found)) => {
                    warn!(
                        "event=record_load module=record_store status=degraded reason=unsupported_version found={found} supported={STORAGE_FORMAT_VERSION}"
                    );
                    (LoadStatus::UnsupportedVersion { found }, Vec::new())
                }
                Err(err) => {
                    warn!(
                        "event=record_load module=record_store status=degraded reason=corrupt bytes={} error_code={}",
                        raw.len(),
                        err.code()
                    );
                    (LoadStatus::Corrupt, Vec::new())
                }
            },
            Err(err) => {
                warn!(
                    "event=record_load module=record_store status=degraded reason=unreadable error={err}"
                );
                (LoadStatus::Unreadable, Vec::new())
            }
        };

        if let LoadStatus::Loaded {
            format_version,
            count,
        } = status
        {
            info!(
                "event=record_load module=record_store status=ok format_version={format_version} count={count}"
            );
        }

        self.load_status = status;
        self.observations = observations;
        self.backup_key = None;
        &self.observations
    }

    /// Prepends `observation` and persists the full list.
    ///
    /// After a degraded load the stored blob is first copied to
    /// `backup_key()`.
    ///
    /// # Errors
    /// - Returns the storage failure unchanged; history is left as it was.
    pub fn append(&mut self, observation: TeacherObservation) -> StorageResult<&[TeacherObservation]> {
        self.preserve_unreadable_blob()?;

        let mut updated = Vec::with_capacity(self.observations.len() + 1);
        updated.push(observation);
        updated.extend(self.observations.iter().cloned());

        let encoded = encode_observations(&updated)?;
        if let Err(err) = self.store.put(OBSERVATIONS_KEY, &encoded) {
            warn!(
                "event=record_append module=record_store status=error count={} bytes={} error={}",
                updated.len(),
                encoded.len(),
                err
            );
            return Err(err);
        }

        info!(
            "event=record_append module=record_store status=ok count={} bytes={}",
            updated.len(),
            encoded.len()
        );
        self.observations = updated;
        Ok(&self.observations)
    }

    /// Returns history, newest first.
    pub fn observations(&self) -> &[TeacherObservation] {
        &self.observations
    }

    pub fn get(&self, id: &ObservationId) -> Option<&TeacherObservation> {
        self.observations
            .iter()
            .find(|observation| &observation.id == id)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn load_status(&self) -> LoadStatus {
        self.load_status
    }

    /// Key the unreadable blob was copied to, once an append has done so.
    pub fn backup_key(&self) -> Option<&str> {
        self.backup_key.as_deref()
    }

    fn preserve_unreadable_blob(&mut self) -> StorageResult<()> {
        if !self.load_status.is_degraded() || self.backup_key.is_some() {
            return Ok(());
        }
        let Some(raw) = self.store.get(OBSERVATIONS_KEY)? else {
            return Ok(());
        };

        let key = format!(
            "{UNREADABLE_BACKUP_PREFIX}{}",
            Utc::now().timestamp_millis()
        );
        if let Err(err) = self.store.put(&key, &raw) {
            warn!(
                "event=record_backup module=record_store status=error bytes={} error={}",
                raw.len(),
                err
            );
            return Err(err);
        }
        info!(
            "event=record_backup module=record_store status=ok bytes={}",
            raw.len()
        );
        self.backup_key = Some(key);
        Ok(())
    }
}
