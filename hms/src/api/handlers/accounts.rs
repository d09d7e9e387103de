//! Administrative account management.
//!
//! All routes require an admin-tier caller. Modifications additionally require the caller's
//! role to reach the target account's role (and the new role, when changing it) in the role
//! hierarchy, so an admin cannot touch super-admins or patients.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::json;

use crate::{
    AppState,
    api::models::{
        accounts::{AccountResponse, AccountUpdate},
        response::ApiResponse,
    },
    audit::{self, AuditAction, AuditEntry},
    auth::{
        current_user::CurrentUser,
        permissions::{ADMIN_OR_ABOVE, authorize},
    },
    db::models::accounts::{Account, AccountUpdateDBRequest},
    errors::Error,
    types::AccountId,
};

async fn fetch_account(state: &AppState, id: AccountId) -> Result<Account, Error> {
    state.auth.accounts().find_by_id(id).await?.ok_or(Error::UserNotFound)
}

/// Get an account by ID
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    tag = "accounts",
    params(("id" = uuid::Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account", body = ApiResponse<AccountResponse>),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Account not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(account_id = %id))]
pub async fn get_account(State(state): State<AppState>, Path(id): Path<AccountId>, caller: CurrentUser) -> Result<ApiResponse<AccountResponse>, Error> {
    authorize(Some(caller.role), ADMIN_OR_ABOVE)?;

    let account = fetch_account(&state, id).await?;
    Ok(ApiResponse::ok(account.into()))
}

/// Change an account's role and/or status
#[utoipa::path(
    patch,
    path = "/api/v1/accounts/{id}",
    tag = "accounts",
    params(("id" = uuid::Uuid, Path, description = "Account ID")),
    request_body = AccountUpdate,
    responses(
        (status = 200, description = "Account updated", body = ApiResponse<AccountResponse>),
        (status = 403, description = "Caller may not manage this account or role"),
        (status = 404, description = "Account not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(account_id = %id))]
pub async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
    caller: CurrentUser,
    payload: Result<Json<AccountUpdate>, JsonRejection>,
) -> Result<ApiResponse<AccountResponse>, Error> {
    authorize(Some(caller.role), ADMIN_OR_ABOVE)?;
    let Json(update) = payload?;

    let target = fetch_account(&state, id).await?;
    if !caller.role.can_manage(target.role) {
        return Err(Error::Forbidden { role: caller.role });
    }
    if let Some(new_role) = update.role
        && !caller.role.can_manage(new_role)
    {
        return Err(Error::Forbidden { role: caller.role });
    }

    let updated = state.auth.accounts().update(id, &AccountUpdateDBRequest::from(update)).await?;

    audit::emit(
        state.auth.audit(),
        AuditEntry::new(
            Some(caller.id),
            AuditAction::UpdateAccount,
            format!("accounts/{id}"),
            json!({
                "before": { "role": target.role, "status": target.status },
                "after": { "role": updated.role, "status": updated.status },
            }),
        ),
    );

    Ok(ApiResponse::ok(updated.into()))
}

/// Soft-delete an account
#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{id}",
    tag = "accounts",
    params(("id" = uuid::Uuid, Path, description = "Account ID")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 403, description = "Caller may not manage this account"),
        (status = 404, description = "Account not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(account_id = %id))]
pub async fn delete_account(State(state): State<AppState>, Path(id): Path<AccountId>, caller: CurrentUser) -> Result<StatusCode, Error> {
    authorize(Some(caller.role), ADMIN_OR_ABOVE)?;

    let target = fetch_account(&state, id).await?;
    if !caller.role.can_manage(target.role) {
        return Err(Error::Forbidden { role: caller.role });
    }

    if !state.auth.accounts().soft_delete(id).await? {
        return Err(Error::UserNotFound);
    }

    audit::emit(
        state.auth.audit(),
        AuditEntry::new(
            Some(caller.id),
            AuditAction::DeleteAccount,
            format!("accounts/{id}"),
            json!({ "email": target.email, "role": target.role }),
        ),
    );

    Ok(StatusCode::NO_CONTENT)
}
