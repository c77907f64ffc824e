use clap::ValueEnum;

use crate::transport::ApiRequest;

/// Filters for `users.list`. Without a domain the configured customer is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserListQuery {
    pub domain: Option<String>,
    pub query: Option<String>,
    pub order_by: Option<String>,
    pub projection: Option<String>,
    pub show_deleted: bool,
}

impl UserListQuery {
    pub fn apply(&self, request: ApiRequest, customer: &str) -> ApiRequest {
        let request = match &self.domain {
            Some(domain) => request.with_query("domain", domain),
            None => request.with_query("customer", customer),
        };
        request
            .with_optional_query("query", self.query.as_deref())
            .with_optional_query("orderBy", self.order_by.as_deref())
            .with_optional_query("projection", self.projection.as_deref())
            .with_optional_query("showDeleted", self.show_deleted.then_some("true"))
    }
}

/// Filters for `groups.list`. `user_key` lists the groups a member belongs to
/// and takes precedence over domain/customer scoping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupListQuery {
    pub domain: Option<String>,
    pub user_key: Option<String>,
    pub query: Option<String>,
}

impl GroupListQuery {
    pub fn apply(&self, request: ApiRequest, customer: &str) -> ApiRequest {
        let request = match (&self.user_key, &self.domain) {
            (Some(user_key), _) => request.with_query("userKey", user_key),
            (None, Some(domain)) => request.with_query("domain", domain),
            (None, None) => request.with_query("customer", customer),
        };
        request.with_optional_query("query", self.query.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberListQuery {
    /// comma separated: OWNER, MANAGER, MEMBER
    pub roles: Option<String>,
    pub include_derived_membership: bool,
}

impl MemberListQuery {
    pub fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .with_optional_query("roles", self.roles.as_deref())
            .with_optional_query(
                "includeDerivedMembership",
                self.include_derived_membership.then_some("true"),
            )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrgUnitKind {
    All,
    Children,
    AllIncludingParent,
}

impl OrgUnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgUnitKind::All => "all",
            OrgUnitKind::Children => "children",
            OrgUnitKind::AllIncludingParent => "allIncludingParent",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrgUnitListQuery {
    pub org_unit_path: Option<String>,
    pub kind: Option<OrgUnitKind>,
}

impl OrgUnitListQuery {
    pub fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .with_optional_query("orgUnitPath", self.org_unit_path.as_deref())
            .with_optional_query("type", self.kind.map(|kind| kind.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleAssignmentQuery {
    pub user_key: Option<String>,
    pub role_id: Option<String>,
}

impl RoleAssignmentQuery {
    pub fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .with_optional_query("userKey", self.user_key.as_deref())
            .with_optional_query("roleId", self.role_id.as_deref())
    }
}
