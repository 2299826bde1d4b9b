//! Shared request and response shapes for the users/products REST API.
//!
//! Successful responses wrap their payload under a named field
//! (`{"users": [...]}`, `{"product": {...}}`); the [`Envelope`] trait names the
//! wrapper for each endpoint and unwraps it to the inner record(s).

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Server-assigned record identity. The API is not strict about the type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(value) => write!(f, "{value}"),
            RecordId::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
    /// Any role the console does not know about.
    #[serde(other)]
    Other,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: RecordId,
    pub name: String,
    /// Decimal text as sent by the server, whether it arrived as a JSON
    /// string or a JSON number.
    #[serde(deserialize_with = "price_text")]
    pub price: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Product creation body. `price` is forwarded as the text the user typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: String,
    pub category: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PriceRepr {
    Text(String),
    Number(serde_json::Number),
}

fn price_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match PriceRepr::deserialize(deserializer)? {
        PriceRepr::Text(text) => text,
        PriceRepr::Number(number) => number.to_string(),
    })
}

/// A named response wrapper that unwraps to its payload.
pub trait Envelope: DeserializeOwned {
    type Inner;

    fn into_inner(self) -> Self::Inner;
}

#[derive(Debug, Deserialize)]
pub struct UsersEnvelope {
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub struct UserEnvelope {
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct ProductsEnvelope {
    pub products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
pub struct ProductEnvelope {
    pub product: Product,
}

impl Envelope for UsersEnvelope {
    type Inner = Vec<User>;

    fn into_inner(self) -> Self::Inner {
        self.users
    }
}

impl Envelope for UserEnvelope {
    type Inner = User;

    fn into_inner(self) -> Self::Inner {
        self.user
    }
}

impl Envelope for ProductsEnvelope {
    type Inner = Vec<Product>;

    fn into_inner(self) -> Self::Inner {
        self.products
    }
}

impl Envelope for ProductEnvelope {
    type Inner = Product;

    fn into_inner(self) -> Self::Inner {
        self.product
    }
}
