use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;

/// JSON body that has passed its `validator` rules
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON: {}", e.body_text())))?;

        value.validate().map_err(validation_message)?;
        Ok(ValidatedJson(value))
    }
}

fn validation_message(errors: ValidationErrors) -> AppError {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let error_messages: Vec<String> = errors
                .iter()
                .map(|e| e.message.as_ref().map(|s| s.to_string()).unwrap_or_default())
                .collect();
            format!("{}: {}", field, error_messages.join(", "))
        })
        .collect();
    fields.sort();

    AppError::BadRequest(format!("Validation failed: {}", fields.join("; ")))
}
