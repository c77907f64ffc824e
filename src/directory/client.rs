use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::config::settings::ApiSettings;
use crate::directory::queries::{
    GroupListQuery, MemberListQuery, OrgUnitListQuery, RoleAssignmentQuery, UserListQuery,
};
use crate::error::{DirectoryError, Result};
use crate::fetch::{PaginatedFetcher, PaginationSettings};
use crate::helpers::cancel::CancelFlag;
use crate::normalize::{normalize_body, NormalizedValue};
use crate::resilience::{RetrySettings, RetryingMutator};
use crate::transport::{ApiRequest, ExecuteRequest, HttpOutcome, RequestExecutor};
use crate::utils::constants::{MAX_RESULTS_PARAM, RATE_LIMITED_STATUS};

/// insert calls answer 200 with the created resource
const CREATED_STATUS: u16 = 200;

/// Admin Directory operations built on the executor and the two drivers.
///
/// Listings go through [`PaginatedFetcher`], inserts through
/// [`RetryingMutator`], everything else is a single executor call.
pub struct DirectoryClient<E = RequestExecutor> {
    executor: E,
    api: Arc<ApiSettings>,
    retry: RetrySettings,
    pagination: PaginationSettings,
    cancel: Option<CancelFlag>,
}

impl DirectoryClient<RequestExecutor> {
    pub fn connect(
        api: Arc<ApiSettings>,
        token: impl Into<String>,
        retry: RetrySettings,
        pagination: PaginationSettings,
    ) -> Result<Self> {
        let executor = RequestExecutor::new(api.clone(), token)?;
        Ok(Self::new(executor, api, retry, pagination))
    }
}

impl<E: ExecuteRequest + Sync> DirectoryClient<E> {
    pub fn new(executor: E, api: Arc<ApiSettings>, retry: RetrySettings, pagination: PaginationSettings) -> Self {
        Self { executor, api, retry, pagination, cancel: None }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    // -------------------------------
    // users
    // -------------------------------

    pub async fn list_users(&self, query: &UserListQuery) -> Result<Vec<NormalizedValue>> {
        let request = query.apply(self.list_request(&["users"])?, &self.api.customer);
        self.list(request, "users").await
    }

    pub async fn get_user(&self, user_key: &str) -> Result<NormalizedValue> {
        self.read(ApiRequest::get(self.endpoint(&["users", user_key])?)).await
    }

    /// `user` is the property map sent as the insert body.
    pub async fn create_user(&self, user: Value) -> Result<NormalizedValue> {
        let label = user.get("primaryEmail").and_then(Value::as_str).unwrap_or("<unnamed>").to_owned();
        let created = self.create(ApiRequest::post(self.endpoint(&["users"])?, user)).await?;
        info!("user '{}' created", label);
        Ok(created)
    }

    pub async fn update_user(&self, user_key: &str, properties: Value) -> Result<NormalizedValue> {
        self.read(ApiRequest::put(self.endpoint(&["users", user_key])?, properties)).await
    }

    pub async fn delete_user(&self, user_key: &str) -> Result<()> {
        self.remove(ApiRequest::delete(self.endpoint(&["users", user_key])?)).await
    }

    pub async fn list_user_aliases(&self, user_key: &str) -> Result<Vec<NormalizedValue>> {
        self.list(ApiRequest::get(self.endpoint(&["users", user_key, "aliases"])?), "aliases").await
    }

    // -------------------------------
    // groups
    // -------------------------------

    pub async fn list_groups(&self, query: &GroupListQuery) -> Result<Vec<NormalizedValue>> {
        let request = query.apply(self.list_request(&["groups"])?, &self.api.customer);
        self.list(request, "groups").await
    }

    pub async fn get_group(&self, group_key: &str) -> Result<NormalizedValue> {
        self.read(ApiRequest::get(self.endpoint(&["groups", group_key])?)).await
    }

    pub async fn create_group(&self, group: Value) -> Result<NormalizedValue> {
        self.create(ApiRequest::post(self.endpoint(&["groups"])?, group)).await
    }

    pub async fn update_group(&self, group_key: &str, properties: Value) -> Result<NormalizedValue> {
        self.read(ApiRequest::put(self.endpoint(&["groups", group_key])?, properties)).await
    }

    pub async fn delete_group(&self, group_key: &str) -> Result<()> {
        self.remove(ApiRequest::delete(self.endpoint(&["groups", group_key])?)).await
    }

    pub async fn list_group_aliases(&self, group_key: &str) -> Result<Vec<NormalizedValue>> {
        self.list(ApiRequest::get(self.endpoint(&["groups", group_key, "aliases"])?), "aliases").await
    }

    // -------------------------------
    // members
    // -------------------------------

    pub async fn list_members(&self, group_key: &str, query: &MemberListQuery) -> Result<Vec<NormalizedValue>> {
        let request = query.apply(self.list_request(&["groups", group_key, "members"])?);
        self.list(request, "members").await
    }

    pub async fn add_member(&self, group_key: &str, member: Value) -> Result<NormalizedValue> {
        self.create(ApiRequest::post(self.endpoint(&["groups", group_key, "members"])?, member)).await
    }

    pub async fn remove_member(&self, group_key: &str, member_key: &str) -> Result<()> {
        self.remove(ApiRequest::delete(self.endpoint(&["groups", group_key, "members", member_key])?)).await
    }

    // -------------------------------
    // org units
    // -------------------------------

    /// Org units are not paged by the service; the fetcher still handles a
    /// token should one ever appear.
    pub async fn list_org_units(&self, query: &OrgUnitListQuery) -> Result<Vec<NormalizedValue>> {
        let request = query.apply(ApiRequest::get(self.endpoint(&["customer", self.api.customer.as_str(), "orgunits"])?));
        self.list(request, "organizationalUnits").await
    }

    /// `org_unit_path` must name a unit; the root path would address the listing.
    pub async fn get_org_unit(&self, org_unit_path: &str) -> Result<NormalizedValue> {
        let path: Vec<&str> = org_unit_path.split('/').filter(|s| !s.is_empty()).collect();
        if path.is_empty() {
            return Err(DirectoryError::Config(format!(
                "org unit path '{}' does not name an org unit",
                org_unit_path
            )));
        }
        let mut segments = vec!["customer", self.api.customer.as_str(), "orgunits"];
        segments.extend(path);
        self.read(ApiRequest::get(self.endpoint(&segments)?)).await
    }

    pub async fn create_org_unit(&self, org_unit: Value) -> Result<NormalizedValue> {
        self.create(ApiRequest::post(self.endpoint(&["customer", self.api.customer.as_str(), "orgunits"])?, org_unit)).await
    }

    // -------------------------------
    // roles & customers
    // -------------------------------

    pub async fn list_roles(&self) -> Result<Vec<NormalizedValue>> {
        self.list(self.list_request(&["customer", self.api.customer.as_str(), "roles"])?, "items").await
    }

    pub async fn list_role_assignments(&self, query: &RoleAssignmentQuery) -> Result<Vec<NormalizedValue>> {
        let request = query.apply(self.list_request(&["customer", self.api.customer.as_str(), "roleassignments"])?);
        self.list(request, "items").await
    }

    pub async fn get_customer(&self) -> Result<NormalizedValue> {
        self.read(ApiRequest::get(self.endpoint(&["customers", self.api.customer.as_str()])?)).await
    }

    // -------------------------------
    // plumbing
    // -------------------------------

    /// Base url plus percent-encoded path segments.
    pub fn endpoint(&self, segments: &[&str]) -> Result<String> {
        let mut url = Url::parse(&self.api.base_url)
            .map_err(|e| DirectoryError::Config(format!("base_url '{}': {}", self.api.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| DirectoryError::Config(format!("base_url '{}' cannot carry a path", self.api.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    fn list_request(&self, segments: &[&str]) -> Result<ApiRequest> {
        Ok(ApiRequest::get(self.endpoint(segments)?).with_optional_query(MAX_RESULTS_PARAM, self.pagination.max_results))
    }

    async fn list(&self, request: ApiRequest, collection_field: &str) -> Result<Vec<NormalizedValue>> {
        let mut fetcher = PaginatedFetcher::new(&self.executor).with_max_pages(self.pagination.max_pages);
        if let Some(cancel) = &self.cancel {
            fetcher = fetcher.with_cancel(cancel.clone());
        }
        let items = fetcher
            .fetch_all(|token| request.clone().with_page_token(token), collection_field)
            .await?;
        debug!("listed {} '{}'", items.len(), collection_field);
        Ok(items)
    }

    async fn read(&self, request: ApiRequest) -> Result<NormalizedValue> {
        self.check_cancel()?;
        let raw_body = self.executor.execute(&request).await?.into_body()?;
        Ok(normalize_body(&raw_body)?)
    }

    async fn remove(&self, request: ApiRequest) -> Result<()> {
        self.check_cancel()?;
        self.executor.execute(&request).await?.into_body()?;
        Ok(())
    }

    async fn create(&self, request: ApiRequest) -> Result<NormalizedValue> {
        let mut mutator = RetryingMutator::new(&self.executor, self.retry.clone());
        if let Some(cancel) = &self.cancel {
            mutator = mutator.with_cancel(cancel.clone());
        }
        let outcome = mutator.execute_with_retry(&request, CREATED_STATUS).await?;
        let raw_body = interpret_mutation(outcome, CREATED_STATUS, self.retry.max_attempts)?;
        Ok(normalize_body(&raw_body)?)
    }

    fn check_cancel(&self) -> Result<()> {
        match &self.cancel {
            Some(cancel) => cancel.check(),
            None => Ok(()),
        }
    }
}

/// Turn the mutator's final outcome into a body or a structured error.
/// A 503 at this point means the retry budget is gone.
pub fn interpret_mutation(outcome: HttpOutcome, expected_status: u16, attempts: u32) -> Result<String> {
    match outcome {
        HttpOutcome::Success { status, raw_body } if status == expected_status => Ok(raw_body),
        HttpOutcome::Failure { status, raw_body } if status == RATE_LIMITED_STATUS => {
            Err(DirectoryError::RateLimitExhausted { attempts, body: raw_body })
        }
        HttpOutcome::Success { status, raw_body } | HttpOutcome::Failure { status, raw_body } => {
            Err(DirectoryError::RequestFailed { status, body: raw_body })
        }
    }
}
