use crate::config::CatalogConfig;
use crate::derivation::DerivationPolicy;
use crate::error::{CatalogError, ErrorState};
use crate::logging::fetch_span;
use crate::metrics::{FetchTimer, METRICS};
use crate::model::{Category, CategoryId, Product, ProductId};
use crate::snapshot::CatalogSnapshot;
use crate::source::{CatalogSource, HttpCatalogSource};
use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{Instrument, debug, info, warn};

pub type FetchOutcome = Result<Arc<CatalogSnapshot>, CatalogError>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

/// What consumers render from: the last published snapshot plus load status.
#[derive(Debug, Clone)]
pub struct CatalogState {
    pub snapshot: Arc<CatalogSnapshot>,
    pub is_loading: bool,
    pub error: Option<ErrorState>,
    /// Time of the last successful publish.
    pub loaded_at: Option<DateTime<Utc>>,
}

impl CatalogState {
    fn initial() -> Self {
        Self {
            snapshot: Arc::new(CatalogSnapshot::empty()),
            is_loading: false,
            error: None,
            loaded_at: None,
        }
    }

    pub fn products(&self) -> &[Arc<Product>] {
        self.snapshot.products()
    }

    pub fn categories(&self) -> &[Arc<Category>] {
        self.snapshot.categories()
    }

    pub fn sale_products(&self) -> &[Arc<Product>] {
        self.snapshot.sale_products()
    }

    pub fn has_loaded(&self) -> bool {
        self.loaded_at.is_some()
    }
}

struct InFlight {
    id: u64,
    fetch: SharedFetch,
}

struct StoreInner {
    source: Arc<dyn CatalogSource>,
    policy: DerivationPolicy,
    state: watch::Sender<CatalogState>,
    inflight: Mutex<Option<InFlight>>,
    next_fetch_id: AtomicU64,
}

/// Process-wide catalog cache.
///
/// Construct once and hand clones to consumers; clones share the same
/// snapshot and the same in-flight fetch.
#[derive(Clone)]
pub struct CatalogStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("CatalogStore")
            .field("products", &state.products().len())
            .field("categories", &state.categories().len())
            .field("is_loading", &state.is_loading)
            .field("error", &state.error)
            .finish()
    }
}

impl CatalogStore {
    pub fn new(source: Arc<dyn CatalogSource>, policy: DerivationPolicy) -> Self {
        let (state, _) = watch::channel(CatalogState::initial());
        Self {
            inner: Arc::new(StoreInner {
                source,
                policy,
                state,
                inflight: Mutex::new(None),
                next_fetch_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let source = HttpCatalogSource::new(config)?;
        Ok(Self::new(Arc::new(source), config.derivation_policy()))
    }

    /// Fetch products and categories and publish a fresh snapshot.
    ///
    /// Either both resources arrive or nothing is published; on failure the
    /// previous snapshot stays and the error is recorded on the state.
    pub async fn load(&self) -> FetchOutcome {
        self.run("load").await
    }

    /// Same contract as [`CatalogStore::load`]. Calls that overlap a running
    /// fetch await its outcome instead of issuing another round trip.
    pub async fn refresh(&self) -> FetchOutcome {
        self.run("refresh").await
    }

    /// Return the published snapshot, loading it first if nothing has been
    /// published yet.
    pub async fn ensure_loaded(&self) -> FetchOutcome {
        {
            let state = self.inner.state.borrow();
            if state.has_loaded() {
                return Ok(state.snapshot.clone());
            }
        }
        self.load().await
    }

    pub fn state(&self) -> CatalogState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.inner.state.borrow().snapshot.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<ErrorState> {
        self.inner.state.borrow().error.clone()
    }

    pub fn search(&self, query: &str) -> Vec<Arc<Product>> {
        self.snapshot().search(query)
    }

    pub fn find_by_id(&self, id: &ProductId) -> Option<Arc<Product>> {
        self.snapshot().find_by_id(id)
    }

    pub fn by_category(&self, id: &CategoryId) -> Option<Vec<Arc<Product>>> {
        self.snapshot().by_category(id)
    }

    fn run(&self, trigger: &'static str) -> SharedFetch {
        let mut slot = self.inner.inflight.lock();
        if let Some(inflight) = slot.as_ref() {
            METRICS.record_coalesced_refresh();
            debug!(trigger, fetch_id = inflight.id, "joining in-flight catalog fetch");
            return inflight.fetch.clone();
        }

        let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let worker = tokio::spawn(
                StoreInner::fetch_and_publish(inner.clone(), id).instrument(fetch_span(trigger)),
            );
            match worker.await {
                Ok(outcome) => outcome,
                Err(error) => {
                    // The worker died before publishing, so the slot is released here.
                    let error = CatalogError::Interrupted(error.to_string());
                    warn!(fetch_id = id, %error, "catalog fetch task did not complete");
                    let recorded = ErrorState::from(&error);
                    inner.finish(id, move |state| state.error = Some(recorded));
                    Err(error)
                }
            }
        });
        let fetch = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(error) => Err(CatalogError::Interrupted(error.to_string())),
            }
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            id,
            fetch: fetch.clone(),
        });
        self.inner.state.send_modify(|state| state.is_loading = true);
        fetch
    }
}

impl StoreInner {
    async fn fetch_and_publish(inner: Arc<StoreInner>, id: u64) -> FetchOutcome {
        info!(fetch_id = id, "catalog fetch started");
        let timer = FetchTimer::start();

        let fetched = tokio::try_join!(
            inner.source.fetch_products(),
            inner.source.fetch_categories()
        );

        match fetched {
            Ok((products, categories)) => {
                let snapshot = Arc::new(CatalogSnapshot::build(
                    products,
                    categories,
                    &inner.policy,
                ));
                let elapsed_ms = timer.elapsed().as_millis() as u64;
                timer.success();
                METRICS.update_product_count(snapshot.products().len());

                let published = snapshot.clone();
                inner.finish(id, move |state| {
                    state.snapshot = published;
                    state.error = None;
                    state.loaded_at = Some(Utc::now());
                });

                info!(
                    fetch_id = id,
                    products = snapshot.products().len(),
                    categories = snapshot.categories().len(),
                    on_sale = snapshot.sale_products().len(),
                    elapsed_ms,
                    "catalog snapshot published"
                );
                Ok(snapshot)
            }
            Err(error) => {
                timer.error(error.category());
                warn!(
                    fetch_id = id,
                    category = error.category(),
                    %error,
                    "catalog fetch failed; keeping previous snapshot"
                );
                let recorded = ErrorState::from(&error);
                inner.finish(id, move |state| state.error = Some(recorded));
                Err(error)
            }
        }
    }

    /// Clear the in-flight slot and apply the final state change under the
    /// same lock, so a new fetch cannot start between the two.
    fn finish(&self, id: u64, apply: impl FnOnce(&mut CatalogState)) {
        let mut slot = self.inflight.lock();
        if slot.as_ref().is_some_and(|inflight| inflight.id == id) {
            slot.take();
        }
        self.state.send_modify(|state| {
            apply(state);
            state.is_loading = false;
        });
    }
}
