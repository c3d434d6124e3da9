//! Gateway boundary between the portal screens and the backend.
//!
//! One `ResourceGateway` per resource type, consumed uniformly by every
//! listing screen; the export feature adds its own job-oriented surface.
//! Implementations live in [`crate::rest`] (the documented REST contract)
//! and [`crate::mock`] (the in-memory stand-in).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiResult, FieldViolation};
use crate::export::{DownloadLink, ExportJob, ExportRequest};
use crate::page::ListResult;
use crate::query::ListQuery;
use crate::session::{Capability, Session};

/// A back-office collection resource.
///
/// The constants pin down the wire contract for the resource's listing
/// screen; the methods give the in-memory backend the same filter/search
/// semantics the documented API applies server-side.
pub trait Resource:
    Clone + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Path segment under the API root, e.g. `franchisors`.
    const BASE_PATH: &'static str;

    /// Filter keys the screen recognizes in its location query string.
    const FILTER_KEYS: &'static [&'static str];

    /// Capability required to touch this resource at all.
    const CAPABILITY: Capability;

    fn id(&self) -> Uuid;

    fn assign_id(&mut self, id: Uuid);

    /// Case-insensitive free-text match; `needle` arrives lowercased.
    fn matches_search(&self, needle: &str) -> bool;

    fn matches_filter(&self, key: &str, value: &str) -> bool;

    /// Sortable representation of a field, when the resource supports it.
    fn sort_value(&self, _field: &str) -> Option<String> {
        None
    }

    /// Field-level validation applied on create/update.
    fn validate(&self) -> Vec<FieldViolation> {
        Vec::new()
    }
}

#[async_trait]
pub trait ResourceGateway<T: Resource>: Send + Sync {
    async fn list(&self, session: &Session, query: &ListQuery) -> ApiResult<ListResult<T>>;

    async fn get_by_id(&self, session: &Session, id: Uuid) -> ApiResult<T>;

    async fn create(&self, session: &Session, payload: T) -> ApiResult<T>;

    async fn update(&self, session: &Session, id: Uuid, payload: T) -> ApiResult<T>;
}

/// Job-oriented additions used by the exports screens.
#[async_trait]
pub trait ExportGateway: Send + Sync {
    /// Submit a new export; the job comes back `Queued`.
    async fn create_job(&self, session: &Session, request: ExportRequest) -> ApiResult<ExportJob>;

    /// Current server-side snapshot of the job.
    async fn get_job(&self, session: &Session, id: Uuid) -> ApiResult<ExportJob>;

    /// Resolve a download URL for a completed job.
    async fn get_download_link(&self, session: &Session, id: Uuid) -> ApiResult<DownloadLink>;
}
