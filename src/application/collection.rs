//! A listable, creatable resource and the view that shows it.
//!
//! [`CollectionPage`] reads the resource through the query cache and owns the
//! creation form. A submission posts once, raises exactly one notification
//! and, only when the server accepted it, invalidates the cached list.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use metrics::counter;
use tracing::{debug, info, warn};

use crate::cache::{QueryCache, QueryEntry, Subscription, mutex_lock};
use crate::domain::error::ValidationError;
use crate::domain::forms::Draft;
use crate::infra::api::ApiError;

use super::forms::{FormMachine, FormPhase};
use super::notifications::Notifications;
use super::records::RecordsApi;

const SOURCE: &str = "application::collection";

/// Payload produced by validating a resource's draft.
pub type PayloadOf<R> = <<R as Resource>::Draft as Draft>::Payload;

pub trait Resource: Send + Sync + 'static {
    /// Query key of the list.
    const KEY: &'static str;
    const CREATED_MESSAGE: &'static str;
    const FAILED_MESSAGE: &'static str;
    const LOAD_FAILED_MESSAGE: &'static str;

    type Record: Send + Sync + 'static;
    type Draft: Draft;

    fn list(api: Arc<dyn RecordsApi>) -> BoxFuture<'static, Result<Vec<Self::Record>, ApiError>>;

    fn create(
        api: Arc<dyn RecordsApi>,
        payload: PayloadOf<Self>,
    ) -> BoxFuture<'static, Result<Self::Record, ApiError>>;
}

/// Subscribe to the list of `R`, fetching it through `api` when needed.
pub fn query_collection<R: Resource>(
    cache: &QueryCache,
    api: &Arc<dyn RecordsApi>,
) -> Subscription<Vec<R::Record>> {
    let api = Arc::clone(api);
    cache.query(R::KEY, move || R::list(Arc::clone(&api)))
}

/// Wait up to `wait` for the subscription to settle, then return whatever
/// the entry holds.
pub async fn settle_within<T: Send + Sync + 'static>(
    mut subscription: Subscription<T>,
    wait: Duration,
) -> QueryEntry<T> {
    match tokio::time::timeout(wait, subscription.settled()).await {
        Ok(entry) => entry,
        Err(_) => subscription.current(),
    }
}

#[derive(Debug)]
pub enum SubmitOutcome<T> {
    Created(T),
    Failed(ApiError),
    Invalid(ValidationError),
    /// The form was closed or already submitting.
    Ignored,
}

impl<T> SubmitOutcome<T> {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitOutcome::Created(_) => "created",
            SubmitOutcome::Failed(_) => "failed",
            SubmitOutcome::Invalid(_) => "invalid",
            SubmitOutcome::Ignored => "ignored",
        }
    }
}

/// Snapshot of the form for rendering.
#[derive(Debug, Clone)]
pub struct FormSnapshot<D> {
    pub phase: FormPhase,
    pub draft: D,
}

pub struct CollectionPage<R: Resource> {
    api: Arc<dyn RecordsApi>,
    cache: QueryCache,
    notifications: Notifications,
    form: Mutex<FormMachine<R::Draft>>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> CollectionPage<R> {
    pub fn new(api: Arc<dyn RecordsApi>, cache: QueryCache, notifications: Notifications) -> Self {
        Self {
            api,
            cache,
            notifications,
            form: Mutex::new(FormMachine::new()),
            _resource: PhantomData,
        }
    }

    pub fn query(&self) -> Subscription<Vec<R::Record>> {
        query_collection::<R>(&self.cache, &self.api)
    }

    pub async fn load(&self, wait: Duration) -> QueryEntry<Vec<R::Record>> {
        settle_within(self.query(), wait).await
    }

    pub fn form(&self) -> FormSnapshot<R::Draft> {
        let form = mutex_lock(&self.form, SOURCE, "form");
        FormSnapshot {
            phase: form.phase(),
            draft: form.draft().clone(),
        }
    }

    /// The "Add"/"Cancel" button.
    pub fn toggle_form(&self) -> FormPhase {
        mutex_lock(&self.form, SOURCE, "toggle_form").toggle()
    }

    pub async fn submit(&self, draft: R::Draft) -> SubmitOutcome<R::Record> {
        let outcome = match self.prepare(draft) {
            Prepared::Ignored(phase) => {
                debug!(
                    resource = R::KEY,
                    phase = phase.as_str(),
                    "Ignoring submit outside of editing"
                );
                SubmitOutcome::Ignored
            }
            Prepared::Invalid(error) => {
                debug!(resource = R::KEY, field = error.field(), error = %error, "Draft rejected");
                self.notifications.error(R::FAILED_MESSAGE);
                SubmitOutcome::Invalid(error)
            }
            Prepared::Ready(payload) => self.send(payload).await,
        };

        counter!(
            "crudboard_mutation_total",
            "resource" => R::KEY,
            "outcome" => outcome.as_str()
        )
        .increment(1);
        outcome
    }

    fn prepare(&self, draft: R::Draft) -> Prepared<PayloadOf<R>> {
        let mut form = mutex_lock(&self.form, SOURCE, "submit");
        if !form.edit(draft) {
            return Prepared::Ignored(form.phase());
        }
        match form.draft().validate() {
            Ok(payload) => {
                form.begin_submit();
                Prepared::Ready(payload)
            }
            Err(error) => Prepared::Invalid(error),
        }
    }

    async fn send(&self, payload: PayloadOf<R>) -> SubmitOutcome<R::Record> {
        let result = R::create(Arc::clone(&self.api), payload).await;
        match result {
            Ok(record) => {
                mutex_lock(&self.form, SOURCE, "finish_success").finish_success();
                info!(resource = R::KEY, "Record created");
                self.notifications.success(R::CREATED_MESSAGE);
                self.cache.invalidate(R::KEY);
                SubmitOutcome::Created(record)
            }
            Err(error) => {
                mutex_lock(&self.form, SOURCE, "finish_failure").finish_failure();
                warn!(resource = R::KEY, error = %error, "Record creation failed");
                self.notifications.error(R::FAILED_MESSAGE);
                SubmitOutcome::Failed(error)
            }
        }
    }
}

enum Prepared<P> {
    Ignored(FormPhase),
    Invalid(ValidationError),
    Ready(P),
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use crate::application::notifications::Severity;
    use crate::application::products::Products;
    use crate::application::testing::FakeRecords;
    use crate::application::users::Users;
    use crate::cache::{QueryPolicy, RetryPolicy};
    use crate::domain::forms::{ProductDraft, UserDraft};

    use super::*;

    struct Harness {
        fake: Arc<FakeRecords>,
        cache: QueryCache,
        notifications: Notifications,
    }

    impl Harness {
        fn new(fake: FakeRecords) -> Self {
            Self::with_policy(
                fake,
                QueryPolicy {
                    retry: RetryPolicy::none(),
                    ..QueryPolicy::default()
                },
            )
        }

        fn with_policy(fake: FakeRecords, policy: QueryPolicy) -> Self {
            Self {
                fake: Arc::new(fake),
                cache: QueryCache::new(policy),
                notifications: Notifications::new(Duration::from_secs(3)),
            }
        }

        fn page<R: Resource>(&self) -> CollectionPage<R> {
            let api: Arc<dyn RecordsApi> = self.fake.clone();
            CollectionPage::new(api, self.cache.clone(), self.notifications.clone())
        }

        fn messages(&self) -> Vec<(Severity, String)> {
            self.notifications
                .visible()
                .into_iter()
                .map(|entry| (entry.notification.severity, entry.notification.message))
                .collect()
        }
    }

    fn widget() -> ProductDraft {
        ProductDraft {
            name: "Widget".into(),
            price: "9.99".into(),
            category: "Tools".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn created_record_refreshes_the_list() {
        let harness = Harness::new(FakeRecords::seeded());
        let page = harness.page::<Products>();

        let before = page.load(Duration::from_secs(1)).await;
        assert_eq!(before.data.as_deref().map(Vec::len), Some(3));

        page.toggle_form();
        let outcome = page.submit(widget()).await;
        assert!(matches!(outcome, SubmitOutcome::Created(_)));
        assert_eq!(harness.fake.writes.load(Ordering::SeqCst), 1);

        let form = page.form();
        assert_eq!(form.phase, FormPhase::Closed);
        assert_eq!(form.draft, ProductDraft::default());
        assert_eq!(
            harness.messages(),
            vec![(Severity::Success, "Product created successfully!".to_string())]
        );

        let after = page.load(Duration::from_secs(1)).await;
        assert_eq!(after.data.as_deref().map(Vec::len), Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_keeps_draft_and_cache() {
        let harness = Harness::new(FakeRecords::seeded());
        harness.fake.fail_writes.store(true, Ordering::SeqCst);
        let page = harness.page::<Products>();
        let before = page.load(Duration::from_secs(1)).await;
        let reads = harness.fake.reads.load(Ordering::SeqCst);

        page.toggle_form();
        let outcome = page.submit(widget()).await;
        assert!(matches!(outcome, SubmitOutcome::Failed(_)));

        let form = page.form();
        assert_eq!(form.phase, FormPhase::Editing);
        assert_eq!(form.draft, widget());
        assert_eq!(
            harness.messages(),
            vec![(Severity::Error, "Failed to create product".to_string())]
        );

        let entry = harness
            .cache
            .peek::<Vec<crudboard_api_types::Product>>("products")
            .expect("entry");
        assert!(!entry.invalidated);
        assert_eq!(entry.last_fetched_at, before.last_fetched_at);
        assert_eq!(harness.fake.reads.load(Ordering::SeqCst), reads);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_draft_sends_nothing() {
        let harness = Harness::new(FakeRecords::seeded());
        let page = harness.page::<Products>();
        page.toggle_form();

        let draft = ProductDraft {
            price: "abc".into(),
            ..widget()
        };
        let outcome = page.submit(draft.clone()).await;

        assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
        assert_eq!(harness.fake.writes.load(Ordering::SeqCst), 0);
        assert_eq!(page.form().phase, FormPhase::Editing);
        assert_eq!(page.form().draft, draft);
        assert_eq!(
            harness.messages(),
            vec![(Severity::Error, "Failed to create product".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn submit_on_closed_form_is_ignored() {
        let harness = Harness::new(FakeRecords::seeded());
        let page = harness.page::<Users>();

        let outcome = page
            .submit(UserDraft {
                name: "Ann".into(),
                email: "ann@example.com".into(),
                ..UserDraft::default()
            })
            .await;

        assert!(matches!(outcome, SubmitOutcome::Ignored));
        assert_eq!(harness.fake.writes.load(Ordering::SeqCst), 0);
        assert!(harness.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn second_submit_while_in_flight_is_ignored() {
        let harness = Harness::new(FakeRecords::seeded().with_latency(Duration::from_millis(100)));
        let page = harness.page::<Products>();
        page.toggle_form();

        let (first, second) = tokio::join!(page.submit(widget()), async {
            tokio::task::yield_now().await;
            page.submit(widget()).await
        });

        assert!(matches!(first, SubmitOutcome::Created(_)));
        assert!(matches!(second, SubmitOutcome::Ignored));
        assert_eq!(harness.fake.writes.load(Ordering::SeqCst), 1);
        assert_eq!(harness.messages().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_read_renders_loading_state() {
        let harness = Harness::new(FakeRecords::seeded().with_latency(Duration::from_secs(5)));
        let page = harness.page::<Users>();

        let entry = page.load(Duration::from_millis(500)).await;
        assert!(entry.is_loading());
        assert!(entry.data.is_none());

        let entry = page.load(Duration::from_secs(10)).await;
        assert!(entry.is_success());
        assert_eq!(harness.fake.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reloading_page_eventually_shows_read_failure() {
        let fake = FakeRecords::seeded().with_latency(Duration::from_millis(500));
        fake.fail_reads.store(true, Ordering::SeqCst);
        let harness = Harness::with_policy(fake, QueryPolicy::default());
        let page = harness.page::<Products>();

        // Each render waits 1.5s; a loading page reloads one second later.
        let mut renders = 0;
        let rendered = loop {
            let entry = page.load(Duration::from_millis(1500)).await;
            renders += 1;
            if !entry.is_loading() || renders == 20 {
                break entry;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        };

        assert!(
            rendered.is_error(),
            "rendered {} after {renders} reloads",
            rendered.status.as_str()
        );
        assert!(renders <= 4, "took {renders} reloads");
        assert!(rendered.data.is_none());

        let again = page.load(Duration::from_millis(100)).await;
        assert!(again.is_error());
        assert!(again.is_fetching);
    }
}
