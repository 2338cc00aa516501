//! OpenAPI document and Swagger UI

use crate::auth::jwt::TokenPair;
use crate::auth::models::{
    ChangePasswordRequest, ChangePasswordResponse, InsertOneResult, LoginRequest, LoginResponse,
    RefreshRequest, SignupRequest, UserPublic,
};
use crate::error::ApiError;
use crate::handlers::{health, users};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Path of the generated document
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";
/// Path of the Swagger UI
pub const SWAGGER_PATH: &str = "/swagger-ui";

#[derive(OpenApi)]
#[openapi(
    info(title = "Daybook API", description = "User accounts and token lifecycle"),
    paths(
        health::health_check,
        health::readiness_check,
        users::signup,
        users::login,
        users::refresh,
        users::me,
        users::change_password,
    ),
    components(schemas(
        ApiError,
        SignupRequest,
        LoginRequest,
        LoginResponse,
        RefreshRequest,
        ChangePasswordRequest,
        ChangePasswordResponse,
        InsertOneResult,
        UserPublic,
        TokenPair,
        health::HealthResponse,
        health::ReadinessResponse,
        health::ReadinessChecks,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness and readiness checks"),
        (name = "users", description = "Signup, login and account management"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
