use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crudboard::{
    application::{
        console::{Console, ConsoleOptions},
        records::RecordsApi,
    },
    cache::{QueryPolicy, RetryPolicy},
    domain::forms::ProductDraft,
    infra::api::ApiError,
};
use crudboard_api_types::{NewProduct, NewUser, Product, RecordId, User};
use metrics_util::debugging::DebuggingRecorder;

struct StaticRecords;

#[async_trait]
impl RecordsApi for StaticRecords {
    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        Ok(Vec::new())
    }

    async fn create_user(&self, _user: &NewUser) -> Result<User, ApiError> {
        Err(ApiError::Timeout {
            path: "users".to_string(),
        })
    }

    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        Ok(Vec::new())
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
        Ok(Product {
            id: RecordId::Int(1),
            name: product.name.clone(),
            price: product.price.clone(),
            category: product.category.clone(),
        })
    }
}

#[tokio::test]
async fn console_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let api: Arc<dyn RecordsApi> = Arc::new(StaticRecords);
    let console = Console::new(
        api,
        ConsoleOptions {
            render_wait: Duration::from_secs(5),
            query: QueryPolicy {
                retry: RetryPolicy::none(),
                ..QueryPolicy::default()
            },
            auto_dismiss_after: Duration::from_secs(3),
        },
    );

    // miss + fetch, then a hit on the fresh entry
    console.products().load(console.render_wait()).await;
    console.products().load(console.render_wait()).await;

    // coalesced: a second query while the first is in flight
    let first = console.users().query();
    let second = console.users().query();
    drop((first, second));

    console.products().toggle_form();
    console
        .products()
        .submit(ProductDraft {
            name: "Widget".into(),
            price: "1".into(),
            category: "Tools".into(),
        })
        .await;

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "crudboard_query_hit_total",
        "crudboard_query_miss_total",
        "crudboard_query_coalesced_total",
        "crudboard_query_fetch_total",
        "crudboard_mutation_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
