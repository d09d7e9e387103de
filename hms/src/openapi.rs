//! OpenAPI documentation for the authentication and account management API.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api::{
    handlers::{accounts, auth, health},
    models::{
        accounts::{AccountResponse, AccountStatus, AccountUpdate, Role},
        auth::{AuthResponse, AuthSuccessResponse, LoginRequest, RefreshRequest, RegisterRequest},
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Access token returned by login, register or refresh:\n\n\
                            ```\nAuthorization: Bearer ACCESS_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        auth::register,
        auth::login,
        auth::refresh,
        auth::me,
        auth::logout,
        accounts::get_account,
        accounts::update_account,
        accounts::delete_account,
        health::health,
    ),
    components(schemas(
        Role,
        AccountStatus,
        AccountResponse,
        AccountUpdate,
        RegisterRequest,
        LoginRequest,
        RefreshRequest,
        AuthResponse,
        AuthSuccessResponse,
        health::HealthResponse,
    )),
    tags(
        (name = "authentication", description = "Registration, login and token management"),
        (name = "accounts", description = "Administrative account management"),
        (name = "health", description = "Liveness"),
    ),
    info(
        title = "Hospital Management API",
        description = "Authentication and role-based access control",
    )
)]
pub struct ApiDoc;
