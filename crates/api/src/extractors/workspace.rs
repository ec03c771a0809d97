use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use bson::oid::ObjectId;
use crewdesk_services::access::{self, WorkspaceContext};

use crate::error::ApiError;
use crate::extractors::auth::{AuthUser, FromRef};
use crate::state::AppState;

/// The per-request workspace authority: resolves the `:workspace_id` path
/// parameter against the authenticated principal's membership. Everything
/// downstream authorizes against this, never against the global role.
#[derive(Debug, Clone)]
pub struct WorkspaceScope(pub WorkspaceContext);

impl<S> FromRequestParts<S> for WorkspaceScope
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let app_state = AppState::from_ref(state);

        let Path(params): Path<std::collections::HashMap<String, String>> =
            Path::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::BadRequest("Missing path parameters".to_string()))?;

        let wid_str = params
            .get("workspace_id")
            .ok_or_else(|| ApiError::BadRequest("Missing workspace_id parameter".to_string()))?;

        let workspace_id = ObjectId::parse_str(wid_str)
            .map_err(|_| ApiError::BadRequest("Invalid workspace_id format".to_string()))?;

        let ctx = access::resolve(&app_state.workspaces, workspace_id, auth.user_id).await?;

        Ok(WorkspaceScope(ctx))
    }
}
