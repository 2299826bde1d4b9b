use std::collections::HashSet;
use std::sync::Arc;

use crudboard_api_types::{NewProduct, Product};
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::domain::forms::ProductDraft;
use crate::infra::api::ApiError;

use super::collection::{CollectionPage, Resource};
use super::records::RecordsApi;

pub struct Products;

impl Resource for Products {
    const KEY: &'static str = "products";
    const CREATED_MESSAGE: &'static str = "Product created successfully!";
    const FAILED_MESSAGE: &'static str = "Failed to create product";
    const LOAD_FAILED_MESSAGE: &'static str = "Error loading products";

    type Record = Product;
    type Draft = ProductDraft;

    fn list(api: Arc<dyn RecordsApi>) -> BoxFuture<'static, Result<Vec<Product>, ApiError>> {
        async move { api.list_products().await }.boxed()
    }

    fn create(
        api: Arc<dyn RecordsApi>,
        payload: NewProduct,
    ) -> BoxFuture<'static, Result<Product, ApiError>> {
        async move { api.create_product(&payload).await }.boxed()
    }
}

pub type ProductsPage = CollectionPage<Products>;

/// Number of distinct category values, compared exactly.
pub fn distinct_categories(products: &[Product]) -> usize {
    products
        .iter()
        .map(|product| product.category.as_str())
        .collect::<HashSet<_>>()
        .len()
}
