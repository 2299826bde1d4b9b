//! Editable drafts for the creation forms.

use crudboard_api_types::{NewProduct, NewUser, Role};

use super::error::ValidationError;

/// A form's editable fields. Validation turns a draft into the request body.
pub trait Draft: Clone + Default + Send + Sync + 'static {
    type Payload: Send + 'static;

    fn validate(&self) -> Result<Self::Payload, ValidationError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub price: String,
    pub category: String,
}

fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required { field })
    } else {
        Ok(())
    }
}

fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

impl Draft for UserDraft {
    type Payload = NewUser;

    fn validate(&self) -> Result<NewUser, ValidationError> {
        required("name", &self.name)?;
        required("email", &self.email)?;
        if !looks_like_email(&self.email) {
            return Err(ValidationError::InvalidEmail { field: "email" });
        }

        Ok(NewUser {
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        })
    }
}

impl Draft for ProductDraft {
    type Payload = NewProduct;

    fn validate(&self) -> Result<NewProduct, ValidationError> {
        required("name", &self.name)?;
        required("price", &self.price)?;
        required("category", &self.category)?;

        let price = self.price.trim();
        if !price.parse::<f64>().is_ok_and(f64::is_finite) {
            return Err(ValidationError::NotANumber {
                field: "price",
                value: price.to_string(),
            });
        }

        Ok(NewProduct {
            name: self.name.clone(),
            price: price.to_string(),
            category: self.category.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price: &str, category: &str) -> ProductDraft {
        ProductDraft {
            name: name.into(),
            price: price.into(),
            category: category.into(),
        }
    }

    #[test]
    fn product_draft_becomes_request_body() {
        let body = product("Widget", "9.99", "Tools")
            .validate()
            .expect("valid draft");
        assert_eq!(
            body,
            NewProduct {
                name: "Widget".into(),
                price: "9.99".into(),
                category: "Tools".into(),
            }
        );
    }

    #[test]
    fn product_requires_every_field() {
        let err = product("", "1", "Tools").validate().expect_err("no name");
        assert_eq!(err.field(), "name");
        let err = product("Widget", "1", "  ").validate().expect_err("no category");
        assert_eq!(err.field(), "category");
    }

    #[test]
    fn product_price_must_be_numeric() {
        for bad in ["abc", "1.2.3", "NaN", "inf"] {
            let err = product("Widget", bad, "Tools")
                .validate()
                .expect_err("not a number");
            assert!(matches!(err, ValidationError::NotANumber { .. }), "{bad}");
        }
        assert!(product("Widget", "10", "Tools").validate().is_ok());
    }

    #[test]
    fn user_draft_defaults_to_user_role() {
        let draft = UserDraft {
            name: "Ann".into(),
            email: "a@x.com".into(),
            ..UserDraft::default()
        };
        let body = draft.validate().expect("valid draft");
        assert_eq!(body.role, Role::User);
    }

    #[test]
    fn user_email_is_checked() {
        let draft = UserDraft {
            name: "Ann".into(),
            email: "not-an-email".into(),
            role: Role::Admin,
        };
        assert_eq!(
            draft.validate(),
            Err(ValidationError::InvalidEmail { field: "email" })
        );
    }
}
