//! Directory module
//!
//! Admin Directory resources (users, groups, members, org units, roles,
//! customers) expressed on top of the transport and the fetch/retry drivers.

pub mod client;
pub mod queries;

pub use client::DirectoryClient;
pub use queries::{
    GroupListQuery, MemberListQuery, OrgUnitKind, OrgUnitListQuery, RoleAssignmentQuery, UserListQuery,
};
