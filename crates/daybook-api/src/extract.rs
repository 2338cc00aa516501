//! Request body extraction with validation
//!
//! [`ValidateJson`] deserializes a JSON body and runs its `validator`
//! rules; both kinds of failure become a 400 with a readable message.

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError, ValidationErrors};

/// JSON extractor that also validates the payload
#[must_use]
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidateJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;

        data.validate().map_err(validation_to_error)?;
        Ok(Self(data))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

fn format_validation_error(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return format!("{field}: {message}");
    }

    match error.code.as_ref() {
        "email" => format!("{field}: must be a valid email address"),
        "length" => match (error.params.get("min"), error.params.get("max")) {
            (Some(min), Some(max)) => {
                format!("{field}: must be between {min} and {max} characters long")
            }
            (Some(min), None) => format!("{field}: must be at least {min} characters long"),
            (None, Some(max)) => format!("{field}: must be at most {max} characters long"),
            _ => format!("{field}: has invalid length"),
        },
        code => format!("{field}: failed validation ({code})"),
    }
}

pub(crate) fn validation_to_error(errors: ValidationErrors) -> AppError {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.keys().collect();
    fields.sort();

    let messages: Vec<String> = fields
        .into_iter()
        .flat_map(|field| {
            field_errors[field]
                .iter()
                .map(move |error| format_validation_error(field, error))
        })
        .collect();

    let message = if messages.is_empty() {
        "Validation failed".to_string()
    } else {
        messages.join(". ")
    };

    AppError::BadRequest(message)
}
