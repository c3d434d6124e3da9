//! List-view controller: one collection screen's query state, its location
//! mirror, and the fetch lifecycle that feeds the table.
//!
//! State mutations and location sync are synchronous; only the network fetch
//! is async. Overlapping fetches are resolved cooperatively: every issued
//! fetch carries a token, and a result whose token has been superseded is
//! dropped on arrival instead of aborted in flight.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::error::{ApiError, ApiResult};
use crate::gateway::{Resource, ResourceGateway};
use crate::page::ListResult;
use crate::query::{ListQuery, Sort};
use crate::session::Session;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Navigable location boundary. The real implementation belongs to the
/// (out-of-scope) routing layer; it must replace, never push, so typing in
/// a filter does not spam the history stack.
pub trait Location: Send {
    fn replace_query(&mut self, query_string: &str);

    fn query_string(&self) -> String;
}

/// Fetch lifecycle of one listing. Exactly one variant at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Idle,
    Loading,
    Loaded(ListResult<T>),
    /// Recoverable in place; the message feeds the retry affordance.
    Failed(ApiError),
    /// Not recoverable in place; the caller must navigate away.
    PermissionDenied,
}

/// Which flavor of empty a loaded-but-empty listing should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyKind {
    /// Active search/filters matched nothing: "adjust your filters".
    NoMatches,
    /// The collection itself is empty: "nothing yet, create one".
    NoData,
}

/// Debounces free-text search input.
///
/// One pending timer per controller: every keystroke bumps a generation
/// counter, and only the future still holding the latest generation when its
/// delay elapses commits its text. Cancellation is the same bump, so
/// unmounting cannot leak a late commit.
#[derive(Debug)]
pub struct SearchDebouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register a keystroke. The returned future resolves to `Some(text)`
    /// iff no newer keystroke (or cancel) arrived during the delay.
    pub fn input(&self, text: impl Into<String>) -> impl Future<Output = Option<String>> + Send {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let counter = Arc::clone(&self.generation);
        let delay = self.delay;
        let text = text.into();
        async move {
            sleep(delay).await;
            if counter.load(Ordering::SeqCst) == generation {
                Some(text)
            } else {
                None
            }
        }
    }

    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Identifies one issued fetch. The embedded query is the snapshot the
/// fetch must run against, immune to later controller mutations.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    token: u64,
    pub query: ListQuery,
}

pub struct ListController<T: Resource> {
    query: ListQuery,
    state: FetchState<T>,
    location: Box<dyn Location>,
    debouncer: SearchDebouncer,
    latest_token: u64,
}

impl<T: Resource> ListController<T> {
    /// Mount a controller for one screen: parse the query out of the current
    /// location, then immediately write the normalized form back so the
    /// location always carries the full contract.
    pub fn mount(location: Box<dyn Location>) -> Self {
        Self::mount_with_debounce(location, DEFAULT_SEARCH_DEBOUNCE)
    }

    pub fn mount_with_debounce(location: Box<dyn Location>, debounce: Duration) -> Self {
        let query = ListQuery::parse(&location.query_string(), T::FILTER_KEYS);
        let mut controller = Self {
            query,
            state: FetchState::Idle,
            location,
            debouncer: SearchDebouncer::new(debounce),
            latest_token: 0,
        };
        controller.sync_location();
        controller
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn state(&self) -> &FetchState<T> {
        &self.state
    }

    fn sync_location(&mut self) {
        let serialized = self.query.to_query_string(T::FILTER_KEYS);
        self.location.replace_query(&serialized);
    }

    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.set_filter(key, value);
        self.sync_location();
    }

    pub fn set_page(&mut self, page: u32) {
        self.query.set_page(page);
        self.sync_location();
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.query.set_page_size(page_size);
        self.sync_location();
    }

    pub fn set_sort(&mut self, sort: Option<Sort>) {
        self.query.set_sort(sort);
        self.sync_location();
    }

    /// Feed one keystroke into the debouncer. The caller awaits the returned
    /// future and, on `Some`, passes the text to [`commit_search`] — so
    /// intermediate keystrokes never reach the gateway.
    ///
    /// [`commit_search`]: Self::commit_search
    pub fn search_input(&self, text: impl Into<String>) -> impl Future<Output = Option<String>> + Send {
        self.debouncer.input(text)
    }

    pub fn commit_search(&mut self, text: impl Into<String>) {
        self.query.set_search(text);
        self.sync_location();
    }

    /// Unmount hook: drops any pending debounce commit.
    pub fn cancel_pending_search(&self) {
        self.debouncer.cancel();
    }

    /// Start a fetch: flip to `Loading`, supersede any in-flight fetch, and
    /// hand back the ticket the eventual result must present.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.latest_token += 1;
        self.state = FetchState::Loading;
        FetchTicket {
            token: self.latest_token,
            query: self.query.clone(),
        }
    }

    /// Apply a fetch outcome. Returns `false` when the ticket was superseded
    /// and the result was discarded.
    pub fn apply_result(
        &mut self,
        ticket: &FetchTicket,
        outcome: ApiResult<ListResult<T>>,
    ) -> bool {
        if ticket.token != self.latest_token {
            warn!(
                resource = T::BASE_PATH,
                stale = ticket.token,
                latest = self.latest_token,
                "discarding stale fetch result"
            );
            return false;
        }
        self.state = match outcome {
            Ok(result) => FetchState::Loaded(result),
            Err(ApiError::Forbidden) => FetchState::PermissionDenied,
            Err(error) => {
                debug!(resource = T::BASE_PATH, %error, "fetch failed");
                FetchState::Failed(error)
            }
        };
        true
    }

    /// Issue a fetch and apply its result, then clamp the page once if the
    /// result shows the query pointing past the last page (e.g. the last
    /// item of the final page was deleted).
    #[instrument(skip_all, fields(resource = T::BASE_PATH))]
    pub async fn run_fetch(
        &mut self,
        gateway: &dyn ResourceGateway<T>,
        session: &Session,
    ) {
        for _ in 0..2 {
            let ticket = self.begin_fetch();
            let outcome = gateway.list(session, &ticket.query).await;
            self.apply_result(&ticket, outcome);

            match self.page_overflow() {
                Some(last_page) => {
                    debug!(
                        resource = T::BASE_PATH,
                        page = self.query.page,
                        last_page,
                        "clamping page past the end"
                    );
                    self.query.set_page(last_page);
                    self.sync_location();
                }
                None => break,
            }
        }
    }

    /// User-facing retry affordance; same semantics as any other fetch.
    pub async fn retry(&mut self, gateway: &dyn ResourceGateway<T>, session: &Session) {
        self.run_fetch(gateway, session).await;
    }

    fn page_overflow(&self) -> Option<u32> {
        match &self.state {
            FetchState::Loaded(result) if result.page > result.total_pages => {
                Some(result.total_pages)
            }
            _ => None,
        }
    }

    /// `Some` when the listing loaded empty; distinguishes "no matches for
    /// these filters" from "the collection has nothing yet".
    pub fn empty_kind(&self) -> Option<EmptyKind> {
        match &self.state {
            FetchState::Loaded(result) if result.is_empty() => {
                if self.query.has_criteria() {
                    Some(EmptyKind::NoMatches)
                } else {
                    Some(EmptyKind::NoData)
                }
            }
            _ => None,
        }
    }
}

impl<T: Resource> Drop for ListController<T> {
    fn drop(&mut self) {
        self.debouncer.cancel();
    }
}
