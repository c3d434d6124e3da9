//! REST backend client.
//!
//! Implements the documented contract the portals consume: one collection
//! endpoint per resource under `v1/`, plus the export job surface. Every
//! response is classified into the [`ApiError`] taxonomy before it leaves
//! this module.

use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::export::{DownloadLink, ExportJob, ExportJobWire, ExportRequest};
use crate::gateway::{ExportGateway, Resource, ResourceGateway};
use crate::page::ListResult;
use crate::query::ListQuery;
use crate::session::{Capability, Session};

pub struct RestBackend {
    http: Client,
    base_url: Url,
    token: String,
}

impl std::fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestBackend {
    pub fn new(base_url: Url, token: impl Into<String>) -> Self {
        let http = Client::builder()
            .user_agent("edufran-backoffice/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            token: token.into(),
        }
    }

    /// Build from configuration; the bearer token comes from the
    /// (out-of-scope) authentication provider at runtime.
    pub fn from_config(cfg: &Config, token: impl Into<String>) -> ApiResult<Self> {
        let base_url = Url::parse(&cfg.api.base_url)
            .map_err(|err| ApiError::Invalid(format!("invalid api.base_url: {err}")))?;
        let http = Client::builder()
            .user_agent("edufran-backoffice/0.1")
            .timeout(std::time::Duration::from_millis(cfg.api.timeout_ms))
            .build()
            .expect("reqwest client");
        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|err| ApiError::Invalid(format!("invalid endpoint {path}: {err}")))
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/json")
    }

    /// Listing URL carrying the full query-string contract; exposed so the
    /// wire shape can be asserted without a server.
    pub fn build_list_request<T: Resource>(&self, query: &ListQuery) -> ApiResult<reqwest::Request> {
        let mut url = self.endpoint(&format!("v1/{}", T::BASE_PATH))?;
        url.set_query(Some(&query.to_query_string(T::FILTER_KEYS)));
        self.request(Method::GET, url)
            .build()
            .map_err(|err| ApiError::Invalid(format!("failed to build request: {err}")))
    }

    async fn dispatch<R: DeserializeOwned>(&self, request: reqwest::Request) -> ApiResult<R> {
        debug!(url = %request.url(), method = %request.method(), "dispatching backend request");
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|err| ApiError::Unavailable(format!("failed to reach backend: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), &body));
        }
        response
            .json::<R>()
            .await
            .map_err(|err| ApiError::Invalid(format!("invalid backend response: {err}")))
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> ApiResult<R> {
        let url = self.endpoint(path)?;
        let request = self
            .request(Method::GET, url)
            .build()
            .map_err(|err| ApiError::Invalid(format!("failed to build request: {err}")))?;
        self.dispatch(request).await
    }

    async fn send_json<B: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ApiResult<R> {
        let url = self.endpoint(path)?;
        let request = self
            .request(method, url)
            .json(body)
            .build()
            .map_err(|err| ApiError::Invalid(format!("failed to build request: {err}")))?;
        self.dispatch(request).await
    }
}

#[async_trait::async_trait]
impl<T: Resource> ResourceGateway<T> for RestBackend {
    async fn list(&self, session: &Session, query: &ListQuery) -> ApiResult<ListResult<T>> {
        if !session.allows(T::CAPABILITY) {
            return Err(ApiError::Forbidden);
        }
        let request = self.build_list_request::<T>(query)?;
        self.dispatch(request).await
    }

    async fn get_by_id(&self, session: &Session, id: Uuid) -> ApiResult<T> {
        if !session.allows(T::CAPABILITY) {
            return Err(ApiError::Forbidden);
        }
        self.get_json(&format!("v1/{}/{id}", T::BASE_PATH)).await
    }

    async fn create(&self, session: &Session, payload: T) -> ApiResult<T> {
        if !session.allows(T::CAPABILITY) {
            return Err(ApiError::Forbidden);
        }
        self.send_json(Method::POST, &format!("v1/{}", T::BASE_PATH), &payload)
            .await
    }

    async fn update(&self, session: &Session, id: Uuid, payload: T) -> ApiResult<T> {
        if !session.allows(T::CAPABILITY) {
            return Err(ApiError::Forbidden);
        }
        self.send_json(Method::PUT, &format!("v1/{}/{id}", T::BASE_PATH), &payload)
            .await
    }
}

#[async_trait::async_trait]
impl ExportGateway for RestBackend {
    async fn create_job(&self, session: &Session, request: ExportRequest) -> ApiResult<ExportJob> {
        if !session.allows(Capability::RequestExports) {
            return Err(ApiError::Forbidden);
        }
        let wire: ExportJobWire = self.send_json(Method::POST, "v1/exports", &request).await?;
        Ok(wire.into_job())
    }

    async fn get_job(&self, session: &Session, id: Uuid) -> ApiResult<ExportJob> {
        if !session.allows(Capability::RequestExports) {
            return Err(ApiError::Forbidden);
        }
        let wire: ExportJobWire = self.get_json(&format!("v1/exports/{id}")).await?;
        Ok(wire.into_job())
    }

    async fn get_download_link(&self, session: &Session, id: Uuid) -> ApiResult<DownloadLink> {
        if !session.allows(Capability::RequestExports) {
            return Err(ApiError::Forbidden);
        }
        self.get_json(&format!("v1/exports/{id}/download")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::model::Franchisor;

    fn backend() -> RestBackend {
        let base = Url::parse("https://api.edufran.com.br/").unwrap();
        RestBackend::new(base, "token-123")
    }

    #[test]
    fn list_request_carries_the_query_contract() {
        let mut query = ListQuery::new();
        query.set_filter("status", "ativo");
        query.set_page_size(25);
        query.set_page(2);

        let request = backend().build_list_request::<Franchisor>(&query).unwrap();
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.url().path(), "/v1/franchisors");

        let qs = request.url().query().unwrap();
        for expected in ["search=", "status=ativo", "page=2", "page_size=25"] {
            assert!(qs.contains(expected), "{expected} missing from {qs}");
        }
    }

    #[test]
    fn requests_are_authenticated() {
        let request = backend()
            .build_list_request::<Franchisor>(&ListQuery::new())
            .unwrap();
        let auth = request
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .unwrap();
        assert_eq!(auth, "Bearer token-123");
    }

    #[test]
    fn relative_endpoints_join_onto_the_base() {
        let url = backend().endpoint("v1/exports/abc/download").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.edufran.com.br/v1/exports/abc/download"
        );
    }

    #[tokio::test]
    async fn capability_short_circuits_before_any_dispatch() {
        // no server behind the base URL; reaching the transport would error
        // with Unavailable, so Forbidden proves the short-circuit
        let school = Session::school(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let result: ApiResult<ListResult<Franchisor>> =
            backend().list(&school, &ListQuery::new()).await;
        assert_eq!(result.unwrap_err(), ApiError::Forbidden);
    }
}
