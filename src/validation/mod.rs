/// Request body validation
///
/// `ValidatedJson<T>` deserializes a JSON body and runs its `validator`
/// rules; both kinds of failure surface as a 422.
use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

/// JSON body that has passed its validation rules
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::Validation(rejection.body_text()))?;

        value.validate().map_err(into_api_error)?;

        Ok(ValidatedJson(value))
    }
}

/// Flatten field errors into one message, first message per field
pub fn into_api_error(errors: ValidationErrors) -> ApiError {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            errs.first().map(|e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("The {} field is invalid.", field),
            })
        })
        .collect();

    messages.sort();
    ApiError::Validation(messages.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Body {
        #[validate(length(min = 1, max = 5, message = "The title field must be 1-5 characters."))]
        title: String,
        #[validate(length(max = 3))]
        tag: String,
    }

    #[test]
    fn test_errors_are_flattened() {
        let body = Body {
            title: String::new(),
            tag: "toolong".to_string(),
        };

        let err = into_api_error(body.validate().unwrap_err());
        match err {
            ApiError::Validation(message) => {
                assert!(message.contains("The title field must be 1-5 characters."));
                assert!(message.contains("The tag field is invalid."));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
