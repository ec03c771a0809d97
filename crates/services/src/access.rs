use bson::oid::ObjectId;
use crewdesk_db::models::{MemberRole, Workspace, WorkspaceMember};
use thiserror::Error;

use crate::dao::base::DaoError;
use crate::dao::workspace::WorkspaceDao;

/// Stable machine-readable authorization failures. The `code()` value is
/// what clients key on; the display string is the human message.
#[derive(Debug, Error, PartialEq)]
pub enum AccessError {
    #[error("Not a member of this workspace")]
    NotAMember,
    #[error("Membership references a deleted workspace")]
    OrphanedMembership,
    #[error("Requires one of the roles: {}", format_roles(.0))]
    InsufficientRole(Vec<MemberRole>),
    #[error("Invalid role: {0}")]
    InvalidRole(String),
    #[error("The workspace owner's membership cannot be changed")]
    CannotModifyOwner,
    #[error("The workspace owner cannot be removed")]
    CannotRemoveOwner,
    #[error("The owner role is assigned only through ownership transfer")]
    CannotPromoteToOwner,
    #[error("Only the workspace owner may do this")]
    OwnerOnly,
}

impl AccessError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAMember => "not_a_member",
            Self::OrphanedMembership => "orphaned_membership",
            Self::InsufficientRole(_) => "insufficient_role",
            Self::InvalidRole(_) => "invalid_role",
            Self::CannotModifyOwner => "cannot_modify_owner",
            Self::CannotRemoveOwner => "cannot_remove_owner",
            Self::CannotPromoteToOwner => "cannot_promote_to_owner",
            Self::OwnerOnly => "owner_only",
        }
    }
}

fn format_roles(roles: &[MemberRole]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Dao(#[from] DaoError),
    #[error(transparent)]
    Access(#[from] AccessError),
}

/// The request-scoped authority for everything downstream: the workspace
/// plus the caller's membership in it. The global user role plays no part
/// once this exists.
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    pub workspace: Workspace,
    pub membership: WorkspaceMember,
}

impl WorkspaceContext {
    pub fn workspace_id(&self) -> ObjectId {
        self.membership.workspace_id
    }

    pub fn user_id(&self) -> ObjectId {
        self.membership.user_id
    }

    pub fn role(&self) -> MemberRole {
        self.membership.role
    }

    pub fn is_owner(&self) -> bool {
        self.workspace.owner_id == self.membership.user_id
    }
}

/// Resolves `(principal, workspace)` into a [`WorkspaceContext`].
///
/// No membership row means `NotAMember`; a membership whose workspace has
/// been deleted is reported as `OrphanedMembership` rather than silently
/// cleaned up.
pub async fn resolve(
    dao: &WorkspaceDao,
    workspace_id: ObjectId,
    user_id: ObjectId,
) -> Result<WorkspaceContext, ResolveError> {
    let membership = dao
        .find_membership(workspace_id, user_id)
        .await?
        .ok_or(AccessError::NotAMember)?;

    let workspace = dao
        .find_active(workspace_id)
        .await?
        .ok_or(AccessError::OrphanedMembership)?;

    Ok(WorkspaceContext {
        workspace,
        membership,
    })
}

/// Pure role policy: owners pass regardless of `required`; everyone else
/// must hold one of the required roles.
pub fn authorize(role: MemberRole, required: &[MemberRole]) -> Result<(), AccessError> {
    if role == MemberRole::Owner || required.contains(&role) {
        Ok(())
    } else {
        Err(AccessError::InsufficientRole(required.to_vec()))
    }
}

/// Guard for `change_role`. Returns the parsed role to assign.
pub fn guard_change_role(
    ctx: &WorkspaceContext,
    target: &WorkspaceMember,
    new_role: &str,
) -> Result<MemberRole, AccessError> {
    let parsed = MemberRole::parse_assignable(new_role);
    if new_role != "owner" && parsed.is_none() {
        return Err(AccessError::InvalidRole(new_role.to_string()));
    }
    authorize(ctx.role(), &[MemberRole::Admin])?;
    if target.user_id == ctx.workspace.owner_id {
        return Err(AccessError::CannotModifyOwner);
    }
    match parsed {
        Some(role) => Ok(role),
        None => Err(AccessError::CannotPromoteToOwner),
    }
}

/// Guard for `remove_member`. Members may remove themselves (leave);
/// removing anyone else takes Owner or Admin.
pub fn guard_remove_member(
    ctx: &WorkspaceContext,
    target: &WorkspaceMember,
) -> Result<(), AccessError> {
    if target.user_id == ctx.workspace.owner_id {
        return Err(AccessError::CannotRemoveOwner);
    }
    if target.user_id == ctx.user_id() {
        return Ok(());
    }
    authorize(ctx.role(), &[MemberRole::Admin])
}

/// Guard for ownership transfer and workspace deletion.
pub fn guard_owner_only(ctx: &WorkspaceContext) -> Result<(), AccessError> {
    if ctx.is_owner() {
        Ok(())
    } else {
        Err(AccessError::OwnerOnly)
    }
}
