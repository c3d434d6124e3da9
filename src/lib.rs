//! Non-visual core of the EduFran back office.
//!
//! Every listing screen across the admin, franchisor, and school portals is
//! the same machine: a query (search, filters, page, page size, sort)
//! mirrored into the navigable location, a debounced search box, and an
//! async fetch whose lifecycle lands in a [`FetchState`]. The exports
//! screens add a second machine, the [`AsyncJobTracker`], which observes a
//! server-processed job until it reaches a terminal state.
//!
//! Both machines talk to the backend through the gateway traits in
//! [`gateway`]; [`rest`] implements them against the documented REST
//! contract and [`mock`] against in-memory stores.

pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod gateway;
pub mod mock;
pub mod page;
pub mod query;
pub mod resources;
pub mod rest;
pub mod session;

pub use controller::{EmptyKind, FetchState, ListController, Location, SearchDebouncer};
pub use error::{ApiError, ApiResult, FieldViolation};
pub use export::{AsyncJobTracker, DownloadLink, ExportJob, ExportKind, ExportRequest, ExportStatus};
pub use gateway::{ExportGateway, Resource, ResourceGateway};
pub use page::ListResult;
pub use query::{ListQuery, Sort, SortDirection};
pub use session::{Capability, Portal, Session};
