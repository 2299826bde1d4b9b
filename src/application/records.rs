//! Port describing the remote users/products store.

use async_trait::async_trait;
use crudboard_api_types::{NewProduct, NewUser, Product, User};

use crate::infra::api::ApiError;

#[async_trait]
pub trait RecordsApi: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, ApiError>;

    async fn create_user(&self, user: &NewUser) -> Result<User, ApiError>;

    async fn list_products(&self) -> Result<Vec<Product>, ApiError>;

    async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError>;
}
