//! In-memory backend used while the real API is not wired in.
//!
//! The gateways here apply the same search/filter/sort/pagination semantics
//! the documented REST contract promises, enforce the capability model, and
//! can be scripted: queued failures, queued latency, and a queued status
//! progression for export jobs. Job progression is consumed per `get_job`
//! call — the simulated server advances, never the client.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;
use uuid::Uuid;

use crate::controller::Location;
use crate::error::{ApiError, ApiResult};
use crate::export::{DownloadLink, ExportJob, ExportRequest, ExportStatus};
use crate::gateway::{ExportGateway, Resource, ResourceGateway};
use crate::page::ListResult;
use crate::query::{ListQuery, SortDirection};
use crate::session::{Capability, Session};

/// In-memory stand-in for the browser location bar.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocation {
    query: Arc<StdMutex<String>>,
}

impl MemoryLocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(query_string: &str) -> Self {
        Self {
            query: Arc::new(StdMutex::new(query_string.to_string())),
        }
    }

    /// What the controller last wrote; shared across clones.
    pub fn current(&self) -> String {
        self.query.lock().expect("location lock").clone()
    }
}

impl Location for MemoryLocation {
    fn replace_query(&mut self, query_string: &str) {
        *self.query.lock().expect("location lock") = query_string.to_string();
    }

    fn query_string(&self) -> String {
        self.current()
    }
}

/// Scripted behaviors shared by both mock gateways.
#[derive(Debug, Default)]
struct Script {
    failures: VecDeque<ApiError>,
    delays: VecDeque<Duration>,
}

impl Script {
    fn take_failure(&mut self) -> Option<ApiError> {
        self.failures.pop_front()
    }

    fn take_delay(&mut self) -> Option<Duration> {
        self.delays.pop_front()
    }
}

// =============================================================================
// Collection gateway
// =============================================================================

pub struct InMemoryGateway<T: Resource> {
    items: Arc<Mutex<Vec<T>>>,
    script: Arc<Mutex<Script>>,
}

impl<T: Resource> Default for InMemoryGateway<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> Clone for InMemoryGateway<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            script: Arc::clone(&self.script),
        }
    }
}

impl<T: Resource> InMemoryGateway<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    pub fn with_items(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items)),
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    pub async fn seed(&self, item: T) {
        self.items.lock().await.push(item);
    }

    pub async fn remove(&self, id: Uuid) {
        self.items.lock().await.retain(|item| item.id() != id);
    }

    /// Queue an error for the next call (any operation).
    pub async fn fail_next(&self, error: ApiError) {
        self.script.lock().await.failures.push_back(error);
    }

    /// Queue artificial latency for the next call.
    pub async fn delay_next(&self, delay: Duration) {
        self.script.lock().await.delays.push_back(delay);
    }

    async fn gate(&self, session: &Session) -> ApiResult<()> {
        let (delay, failure) = {
            let mut script = self.script.lock().await;
            (script.take_delay(), script.take_failure())
        };
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        if !session.allows(T::CAPABILITY) {
            return Err(ApiError::Forbidden);
        }
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(())
    }

    /// The server-side evaluation the documented API performs: search, then
    /// filters, then sort, then slice.
    fn evaluate(items: &[T], query: &ListQuery) -> ListResult<T> {
        let needle = query.search.trim().to_lowercase();
        let mut matched: Vec<T> = items
            .iter()
            .filter(|item| needle.is_empty() || item.matches_search(&needle))
            .filter(|item| {
                query
                    .filters
                    .iter()
                    .all(|(key, value)| item.matches_filter(key, value))
            })
            .cloned()
            .collect();

        if let Some(sort) = &query.sort {
            matched.sort_by(|a, b| {
                let ordering = a.sort_value(&sort.field).cmp(&b.sort_value(&sort.field));
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        ListResult::paginate(matched, query.page, query.page_size)
    }
}

#[async_trait::async_trait]
impl<T: Resource> ResourceGateway<T> for InMemoryGateway<T> {
    async fn list(&self, session: &Session, query: &ListQuery) -> ApiResult<ListResult<T>> {
        self.gate(session).await?;
        let items = self.items.lock().await;
        let result = Self::evaluate(&items, query);
        debug!(
            resource = T::BASE_PATH,
            total = result.total,
            page = result.page,
            "mock list evaluated"
        );
        Ok(result)
    }

    async fn get_by_id(&self, session: &Session, id: Uuid) -> ApiResult<T> {
        self.gate(session).await?;
        let items = self.items.lock().await;
        items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn create(&self, session: &Session, mut payload: T) -> ApiResult<T> {
        self.gate(session).await?;
        let violations = payload.validate();
        if !violations.is_empty() {
            return Err(ApiError::ValidationFailed { violations });
        }
        payload.assign_id(Uuid::new_v4());
        let mut items = self.items.lock().await;
        items.push(payload.clone());
        Ok(payload)
    }

    async fn update(&self, session: &Session, id: Uuid, mut payload: T) -> ApiResult<T> {
        self.gate(session).await?;
        let violations = payload.validate();
        if !violations.is_empty() {
            return Err(ApiError::ValidationFailed { violations });
        }
        payload.assign_id(id);
        let mut items = self.items.lock().await;
        match items.iter_mut().find(|item| item.id() == id) {
            Some(slot) => {
                *slot = payload.clone();
                Ok(payload)
            }
            None => Err(ApiError::NotFound),
        }
    }
}

// =============================================================================
// Export gateway
// =============================================================================

struct JobEntry {
    job: ExportJob,
    /// Statuses the simulated server will walk through, one per `get_job`.
    progression: VecDeque<ExportStatus>,
    download_url: String,
}

pub struct InMemoryExportGateway {
    jobs: Arc<Mutex<HashMap<Uuid, JobEntry>>>,
    default_progression: Vec<ExportStatus>,
    link_ttl: ChronoDuration,
    script: Arc<Mutex<Script>>,
    get_job_calls: Arc<Mutex<u32>>,
}

impl Default for InMemoryExportGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryExportGateway {
    pub fn new() -> Self {
        Self::with_progression(vec![ExportStatus::Processing, ExportStatus::Completed])
    }

    /// Script the status walk each new job takes, one step per `get_job`.
    pub fn with_progression(progression: Vec<ExportStatus>) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            default_progression: progression,
            link_ttl: ChronoDuration::hours(24),
            script: Arc::new(Mutex::new(Script::default())),
            get_job_calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_link_ttl(mut self, ttl: ChronoDuration) -> Self {
        self.link_ttl = ttl;
        self
    }

    pub async fn fail_next(&self, error: ApiError) {
        self.script.lock().await.failures.push_back(error);
    }

    /// Simulate the server expiring a link out from under a fresh-looking
    /// local snapshot.
    pub async fn invalidate_link(&self, id: Uuid) {
        if let Some(entry) = self.jobs.lock().await.get_mut(&id) {
            entry.job.expires_at = Some(Utc::now() - ChronoDuration::hours(1));
        }
    }

    pub async fn get_job_calls(&self) -> u32 {
        *self.get_job_calls.lock().await
    }

    // Pops exactly what the progression scripts, including sequences a
    // well-behaved server would never produce — the tracker's job is to
    // survive those.
    fn advance(&self, entry: &mut JobEntry) {
        if let Some(next) = entry.progression.pop_front() {
            entry.job.status = next;
            match next {
                ExportStatus::Completed => {
                    entry.job.expires_at = Some(Utc::now() + self.link_ttl);
                    entry.job.row_count = Some(128);
                }
                ExportStatus::Failed => {
                    entry.job.error_message = Some("export worker failed".to_string());
                }
                _ => {}
            }
        }
    }
}

#[async_trait::async_trait]
impl ExportGateway for InMemoryExportGateway {
    async fn create_job(&self, session: &Session, request: ExportRequest) -> ApiResult<ExportJob> {
        if !session.allows(Capability::RequestExports) {
            return Err(ApiError::Forbidden);
        }
        if let Some(error) = self.script.lock().await.take_failure() {
            return Err(error);
        }
        let job = ExportJob {
            id: Uuid::new_v4(),
            kind: request.kind,
            status: ExportStatus::Queued,
            requested_by: session.user_id,
            requested_at: Utc::now(),
            expires_at: None,
            row_count: None,
            error_message: None,
            filters: request.filters,
        };
        let entry = JobEntry {
            job: job.clone(),
            progression: self.default_progression.iter().copied().collect(),
            download_url: format!("https://exports.example.com/{}.csv", job.id),
        };
        self.jobs.lock().await.insert(job.id, entry);
        debug!(job = %job.id, "mock export job created");
        Ok(job)
    }

    async fn get_job(&self, session: &Session, id: Uuid) -> ApiResult<ExportJob> {
        if !session.allows(Capability::RequestExports) {
            return Err(ApiError::Forbidden);
        }
        if let Some(error) = self.script.lock().await.take_failure() {
            return Err(error);
        }
        *self.get_job_calls.lock().await += 1;
        let mut jobs = self.jobs.lock().await;
        let entry = jobs.get_mut(&id).ok_or(ApiError::NotFound)?;
        self.advance(entry);
        Ok(entry.job.clone())
    }

    async fn get_download_link(&self, session: &Session, id: Uuid) -> ApiResult<DownloadLink> {
        if !session.allows(Capability::RequestExports) {
            return Err(ApiError::Forbidden);
        }
        let jobs = self.jobs.lock().await;
        let entry = jobs.get(&id).ok_or(ApiError::NotFound)?;
        match entry.job.effective_status(Utc::now()) {
            ExportStatus::Completed => Ok(DownloadLink {
                url: entry.download_url.clone(),
            }),
            ExportStatus::Expired => Err(ApiError::Expired),
            ExportStatus::Queued | ExportStatus::Processing => Err(ApiError::NotReady),
            ExportStatus::Failed => Err(ApiError::NotFound),
        }
    }
}
