//! Export jobs: server-reported lifecycle and the tracker that observes it.
//!
//! A job's status is server truth. The client never advances a status on its
//! own; the one passive reinterpretation is `Completed` reading as `Expired`
//! once `now` passes `expires_at`. Anything the gateway reports that the
//! state machine does not allow is rendered as a generic failure instead of
//! crashing the detail view.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::error::{ApiError, ApiResult};
use crate::gateway::ExportGateway;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Expired,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Queued => "queued",
            ExportStatus::Processing => "processing",
            ExportStatus::Completed => "completed",
            ExportStatus::Failed => "failed",
            ExportStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "queued" => Some(ExportStatus::Queued),
            "processing" => Some(ExportStatus::Processing),
            "completed" => Some(ExportStatus::Completed),
            "failed" => Some(ExportStatus::Failed),
            "expired" => Some(ExportStatus::Expired),
            _ => None,
        }
    }

    /// Terminal states end polling.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExportStatus::Completed | ExportStatus::Failed | ExportStatus::Expired
        )
    }

    /// Whether `next` is a legal observation after `self`.
    ///
    /// Polling samples the server, so skipping `Processing` is legal; moving
    /// backwards (e.g. `Completed` then `Queued`) is not.
    pub fn may_follow(self, next: ExportStatus) -> bool {
        use ExportStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Queued, Processing | Completed | Failed) => true,
            (Processing, Completed | Failed) => true,
            (Completed, Expired) => true,
            _ => false,
        }
    }
}

/// What the user asked to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Franchisors,
    Schools,
    Users,
    Subscriptions,
    AuditLog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub kind: ExportKind,
    /// Filters active on the listing when the export was requested.
    pub filters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: uuid::Uuid,
    pub kind: ExportKind,
    pub status: ExportStatus,
    pub requested_by: uuid::Uuid,
    pub requested_at: DateTime<Utc>,
    /// Only meaningful while `status` is `Completed`.
    pub expires_at: Option<DateTime<Utc>>,
    pub row_count: Option<u64>,
    pub error_message: Option<String>,
    pub filters: BTreeMap<String, String>,
}

impl ExportJob {
    /// `Completed` reads as `Expired` once the link is past its expiry. No
    /// stored state changes; this is a view over the snapshot.
    pub fn effective_status(&self, now: DateTime<Utc>) -> ExportStatus {
        match (self.status, self.expires_at) {
            (ExportStatus::Completed, Some(expires_at)) if expires_at <= now => {
                ExportStatus::Expired
            }
            (status, _) => status,
        }
    }

    pub fn can_download(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == ExportStatus::Completed
    }
}

/// Wire shape for job snapshots; `status` stays a plain string so an unknown
/// value from the backend degrades instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJobWire {
    pub id: uuid::Uuid,
    pub kind: ExportKind,
    pub status: String,
    pub requested_by: uuid::Uuid,
    pub requested_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub row_count: Option<u64>,
    pub error_message: Option<String>,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

impl ExportJobWire {
    pub fn into_job(self) -> ExportJob {
        let (status, error_message) = match ExportStatus::parse(&self.status) {
            Some(status) => (status, self.error_message),
            None => {
                warn!(status = %self.status, job = %self.id, "unknown export status from backend");
                (
                    ExportStatus::Failed,
                    Some("export reported an unknown status".to_string()),
                )
            }
        };
        ExportJob {
            id: self.id,
            kind: self.kind,
            status,
            requested_by: self.requested_by,
            requested_at: self.requested_at,
            expires_at: self.expires_at,
            row_count: self.row_count,
            error_message,
            filters: self.filters,
        }
    }
}

/// Observes one job from a detail view.
///
/// Holds the latest snapshot and computes the UI affordances from it; every
/// snapshot comes from the gateway and replaces the previous one wholesale.
#[derive(Debug, Default)]
pub struct AsyncJobTracker {
    job: Option<ExportJob>,
}

impl AsyncJobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job(&self) -> Option<&ExportJob> {
        self.job.as_ref()
    }

    /// Fetch the current snapshot and adopt it.
    #[instrument(skip_all, fields(job = %id))]
    pub async fn refresh(
        &mut self,
        gateway: &dyn ExportGateway,
        session: &Session,
        id: uuid::Uuid,
    ) -> ApiResult<&ExportJob> {
        let snapshot = gateway.get_job(session, id).await?;
        self.accept(snapshot);
        Ok(self.job.as_ref().expect("snapshot was just stored"))
    }

    /// Adopt a snapshot, demoting illegal regressions to a generic failure.
    fn accept(&mut self, snapshot: ExportJob) {
        let snapshot = match &self.job {
            Some(previous) if !previous.status.may_follow(snapshot.status) => {
                warn!(
                    from = previous.status.as_str(),
                    to = snapshot.status.as_str(),
                    job = %snapshot.id,
                    "out-of-order export status from backend"
                );
                ExportJob {
                    status: ExportStatus::Failed,
                    error_message: Some("export reported an inconsistent status".to_string()),
                    ..snapshot
                }
            }
            _ => snapshot,
        };
        debug!(job = %snapshot.id, status = snapshot.status.as_str(), "export snapshot adopted");
        self.job = Some(snapshot);
    }

    pub fn can_download(&self, now: DateTime<Utc>) -> bool {
        self.job.as_ref().is_some_and(|job| job.can_download(now))
    }

    /// Resolve the download URL.
    ///
    /// The local snapshot is advisory: a locally-downloadable job may still
    /// come back `Expired` from the server, and the server answer wins.
    pub async fn request_download_link(
        &self,
        gateway: &dyn ExportGateway,
        session: &Session,
        id: uuid::Uuid,
    ) -> ApiResult<DownloadLink> {
        if !self.can_download(Utc::now()) {
            return Err(ApiError::NotReady);
        }
        gateway.get_download_link(session, id).await
    }

    /// Poll the gateway until the job reaches a terminal state.
    ///
    /// Stops on the first terminal observation; never polls past
    /// `max_polls`. Gateway errors surface immediately — the retry control
    /// belongs to the user, not this loop.
    #[instrument(skip_all, fields(job = %id))]
    pub async fn poll_until_terminal(
        &mut self,
        gateway: &dyn ExportGateway,
        session: &Session,
        id: uuid::Uuid,
        interval: Duration,
        max_polls: u32,
    ) -> ApiResult<ExportJob> {
        for attempt in 0..max_polls {
            let job = self.refresh(gateway, session, id).await?;
            if job.effective_status(Utc::now()).is_terminal() {
                return Ok(job.clone());
            }
            if attempt + 1 < max_polls {
                sleep(interval).await;
            }
        }
        Err(ApiError::Unavailable(
            "export did not reach a terminal state within the polling budget".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    fn job(status: ExportStatus) -> ExportJob {
        ExportJob {
            id: Uuid::new_v4(),
            kind: ExportKind::Franchisors,
            status,
            requested_by: Uuid::new_v4(),
            requested_at: Utc::now(),
            expires_at: None,
            row_count: None,
            error_message: None,
            filters: BTreeMap::new(),
        }
    }

    #[test]
    fn transition_table_allows_sampled_progress_only() {
        use ExportStatus::*;
        assert!(Queued.may_follow(Processing));
        assert!(Queued.may_follow(Completed)); // poll may skip Processing
        assert!(Processing.may_follow(Failed));
        assert!(Completed.may_follow(Expired));
        assert!(Queued.may_follow(Queued));

        assert!(!Completed.may_follow(Queued));
        assert!(!Failed.may_follow(Completed));
        assert!(!Expired.may_follow(Completed));
        assert!(!Queued.may_follow(Expired));
    }

    #[test]
    fn completed_reads_expired_after_the_deadline() {
        let now = Utc::now();
        let mut completed = job(ExportStatus::Completed);
        completed.expires_at = Some(now + ChronoDuration::hours(1));
        assert_eq!(completed.effective_status(now), ExportStatus::Completed);
        assert!(completed.can_download(now));

        let later = now + ChronoDuration::hours(2);
        assert_eq!(completed.effective_status(later), ExportStatus::Expired);
        assert!(!completed.can_download(later));
        // the stored status never changed
        assert_eq!(completed.status, ExportStatus::Completed);
    }

    #[test]
    fn completed_without_expiry_stays_downloadable() {
        let completed = job(ExportStatus::Completed);
        assert!(completed.can_download(Utc::now() + ChronoDuration::days(365)));
    }

    #[test]
    fn unknown_wire_status_degrades_to_failed() {
        let wire = ExportJobWire {
            id: Uuid::new_v4(),
            kind: ExportKind::Schools,
            status: "exploded".into(),
            requested_by: Uuid::new_v4(),
            requested_at: Utc::now(),
            expires_at: None,
            row_count: None,
            error_message: None,
            filters: BTreeMap::new(),
        };
        let job = wire.into_job();
        assert_eq!(job.status, ExportStatus::Failed);
        assert!(job.error_message.is_some());
    }

    #[test]
    fn tracker_demotes_regressions_to_failed() {
        let mut tracker = AsyncJobTracker::new();
        tracker.accept(job(ExportStatus::Completed));

        let mut regression = job(ExportStatus::Queued);
        regression.id = tracker.job().unwrap().id;
        tracker.accept(regression);

        let observed = tracker.job().unwrap();
        assert_eq!(observed.status, ExportStatus::Failed);
        assert!(observed
            .error_message
            .as_deref()
            .unwrap()
            .contains("inconsistent"));
    }
}
