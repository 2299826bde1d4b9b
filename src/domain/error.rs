use thiserror::Error;

/// Client-side rejection of a draft before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("`{field}` is required")]
    Required { field: &'static str },
    #[error("`{field}` must be a number, got `{value}`")]
    NotANumber { field: &'static str, value: String },
    #[error("`{field}` must be an email address")]
    InvalidEmail { field: &'static str },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Required { field }
            | ValidationError::NotANumber { field, .. }
            | ValidationError::InvalidEmail { field } => field,
        }
    }
}
