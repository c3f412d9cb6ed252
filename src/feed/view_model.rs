use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use super::cursor::FeedCursor;
use crate::connectivity::{has_internet_connection, ConnectivityProvider};
use crate::news::{Article, NewsResponse, NewsSource, SourceError};
use crate::resource::Resource;
use crate::storage::ArticleStore;

pub const NO_CONNECTION_MESSAGE: &str = "No internet connection";
pub const NETWORK_FAILURE_MESSAGE: &str = "Network Failure";
pub const CONVERSION_ERROR_MESSAGE: &str = "Conversion Error";

/// State published on a feed channel.
pub type FeedState = Resource<Arc<NewsResponse>>;

/// The two independent paginated feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// Top headlines for a country code
    BreakingNews,
    /// Free-text search results
    Search,
}

/// How a [`NewsViewModel::request_page`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// Loading was published, followed by exactly one Success or Error
    Completed,
    /// The token fired; Loading may have been published, nothing after it
    Cancelled,
    /// Another request for the same feed was in flight; nothing was published
    Rejected,
}

struct FeedSlot {
    state: watch::Sender<FeedState>,
    cursor: Mutex<FeedCursor>,
}

impl FeedSlot {
    fn new() -> Self {
        let (state, _) = watch::channel(Resource::Loading);
        Self {
            state,
            cursor: Mutex::new(FeedCursor::default()),
        }
    }

    fn publish(&self, state: FeedState) {
        // send_replace stores the value even when nobody is subscribed yet
        self.state.send_replace(state);
    }
}

/// Paginated fetch-and-merge state machine behind the breaking-news and
/// search screens.
///
/// Each feed owns a [`FeedCursor`] and a `watch` channel. A request publishes
/// `Loading`, checks connectivity, fetches the cursor's page, merges it, and
/// publishes the outcome. Requests on one feed are serialized: while one is
/// in flight, further calls for that feed are rejected. The two feeds never
/// touch each other's state.
pub struct NewsViewModel<S, A, C> {
    source: S,
    store: A,
    connectivity: C,
    breaking_news: FeedSlot,
    search: FeedSlot,
}

impl<S, A, C> NewsViewModel<S, A, C>
where
    S: NewsSource,
    A: ArticleStore,
    C: ConnectivityProvider,
{
    pub fn new(source: S, store: A, connectivity: C) -> Self {
        Self {
            source,
            store,
            connectivity,
            breaking_news: FeedSlot::new(),
            search: FeedSlot::new(),
        }
    }

    fn slot(&self, feed: FeedKind) -> &FeedSlot {
        match feed {
            FeedKind::BreakingNews => &self.breaking_news,
            FeedKind::Search => &self.search,
        }
    }

    // ========================================================================
    // Feed Requests
    // ========================================================================

    /// Fetch the next page of `feed` for `parameter` (a country code or a
    /// search query) and publish the result.
    ///
    /// A parameter different from the previous call's starts the feed over
    /// at page 1. The parameter is passed to the source unvalidated.
    pub async fn request_page(
        &self,
        feed: FeedKind,
        parameter: &str,
        cancel: &CancellationToken,
    ) -> PageRequest {
        let slot = self.slot(feed);
        let Ok(mut cursor) = slot.cursor.try_lock() else {
            tracing::debug!(feed = ?feed, "Page request already in flight, rejecting");
            return PageRequest::Rejected;
        };

        if cancel.is_cancelled() {
            return PageRequest::Cancelled;
        }

        slot.publish(Resource::Loading);

        // The cursor changes only together with a terminal publish
        if !has_internet_connection(&self.connectivity) {
            tracing::info!(feed = ?feed, "No usable network transport, skipping fetch");
            commit_target(feed, &mut cursor, parameter);
            slot.publish(stale_error(NO_CONNECTION_MESSAGE, &cursor));
            return PageRequest::Completed;
        }

        let page = cursor.page_for(parameter);
        let fetch = async {
            match feed {
                FeedKind::BreakingNews => self.source.top_headlines(parameter, page).await,
                FeedKind::Search => self.source.search(parameter, page).await,
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(feed = ?feed, page = page, "Page request cancelled");
                return PageRequest::Cancelled;
            }
            result = fetch => result,
        };

        commit_target(feed, &mut cursor, parameter);
        let state = match result {
            Ok(response) => {
                let fetched = response.articles.len();
                let merged = cursor.merge(response);
                tracing::debug!(
                    feed = ?feed,
                    page = page,
                    fetched = fetched,
                    total = merged.articles.len(),
                    "Merged page"
                );
                Resource::success(merged)
            }
            Err(SourceError::Unsuccessful { status, message }) => {
                tracing::warn!(feed = ?feed, page = page, status = ?status, message = %message, "News source refused request");
                stale_error(message, &cursor)
            }
            Err(SourceError::Network(e)) => {
                tracing::warn!(feed = ?feed, page = page, error = %e, "Network failure fetching page");
                stale_error(NETWORK_FAILURE_MESSAGE, &cursor)
            }
            Err(SourceError::Conversion(e)) => {
                tracing::warn!(feed = ?feed, page = page, error = %e, "Could not decode page");
                stale_error(CONVERSION_ERROR_MESSAGE, &cursor)
            }
        };

        slot.publish(state);
        PageRequest::Completed
    }

    /// Next page of top headlines for `country_code`.
    pub async fn breaking_news(
        &self,
        country_code: &str,
        cancel: &CancellationToken,
    ) -> PageRequest {
        self.request_page(FeedKind::BreakingNews, country_code, cancel)
            .await
    }

    /// Next page of search results for `query`.
    pub async fn search_news(&self, query: &str, cancel: &CancellationToken) -> PageRequest {
        self.request_page(FeedKind::Search, query, cancel).await
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Subscribe to `feed`. The receiver sees the current state immediately
    /// and every later publish.
    pub fn subscribe(&self, feed: FeedKind) -> watch::Receiver<FeedState> {
        self.slot(feed).state.subscribe()
    }

    /// Current state of `feed`.
    pub fn state(&self, feed: FeedKind) -> FeedState {
        self.slot(feed).state.borrow().clone()
    }

    /// Snapshot of `feed`'s cursor. Waits for an in-flight request to finish.
    pub async fn cursor(&self, feed: FeedKind) -> FeedCursor {
        self.slot(feed).cursor.lock().await.clone()
    }

    // ========================================================================
    // Saved Articles
    // ========================================================================

    /// Save `article` for offline reading. Failures are logged, not returned.
    pub async fn save_article(&self, article: &Article) {
        if let Err(e) = self.store.upsert(article).await {
            tracing::warn!(url = %article.url, error = %e, "Failed to save article");
        }
    }

    /// Remove the saved copy of `article`. Failures are logged, not returned.
    pub async fn delete_article(&self, article: &Article) {
        if let Err(e) = self.store.delete_by_url(&article.url).await {
            tracing::warn!(url = %article.url, error = %e, "Failed to delete saved article");
        }
    }

    /// Live view of all saved articles.
    pub fn saved_articles(&self) -> watch::Receiver<Arc<Vec<Article>>> {
        self.store.observe_all()
    }
}

fn commit_target(feed: FeedKind, cursor: &mut FeedCursor, parameter: &str) {
    if cursor.retarget(parameter) {
        tracing::debug!(feed = ?feed, parameter = %parameter, "Parameter changed, cursor reset");
    }
}

/// Error state that keeps whatever the feed has already shown.
fn stale_error(message: impl Into<String>, cursor: &FeedCursor) -> FeedState {
    Resource::Error {
        message: message.into(),
        data: cursor.accumulated.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::StaticConnectivity;
    use crate::news::Source;
    use crate::storage::Database;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Source that replays scripted results and records every call.
    #[derive(Default)]
    struct ScriptedSource {
        results: StdMutex<VecDeque<Result<NewsResponse, SourceError>>>,
        calls: StdMutex<Vec<(String, u32)>>,
    }

    impl ScriptedSource {
        fn with(results: Vec<Result<NewsResponse, SourceError>>) -> Self {
            Self {
                results: StdMutex::new(results.into()),
                calls: StdMutex::default(),
            }
        }

        fn next(&self, parameter: &str, page: u32) -> Result<NewsResponse, SourceError> {
            self.calls
                .lock()
                .unwrap()
                .push((parameter.to_string(), page));
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SourceError::Conversion("script exhausted".into())))
        }

        fn calls(&self) -> Vec<(String, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NewsSource for ScriptedSource {
        async fn top_headlines(&self, country: &str, page: u32) -> Result<NewsResponse, SourceError> {
            self.next(country, page)
        }

        async fn search(&self, query: &str, page: u32) -> Result<NewsResponse, SourceError> {
            self.next(query, page)
        }
    }

    fn article(url: &str) -> Article {
        Article {
            source: Some(Source::from_name("Wire")),
            author: None,
            title: format!("Title {}", url),
            description: None,
            url: url.to_string(),
            url_to_image: None,
            published_at: "2024-01-01T00:00:00Z".to_string(),
            content: None,
        }
    }

    fn page(prefix: &str, count: usize, total: u32) -> NewsResponse {
        NewsResponse {
            status: "ok".to_string(),
            total_results: total,
            articles: (0..count)
                .map(|i| article(&format!("https://example.com/{}/{}", prefix, i)))
                .collect(),
        }
    }

    async fn view_model(
        source: Arc<ScriptedSource>,
        connectivity: StaticConnectivity,
    ) -> NewsViewModel<Arc<ScriptedSource>, Database, StaticConnectivity> {
        let db = Database::open(":memory:").await.unwrap();
        NewsViewModel::new(source, db, connectivity)
    }

    fn article_count(state: &FeedState) -> usize {
        state.data().map_or(0, |r| r.articles.len())
    }

    #[tokio::test]
    async fn test_initial_state_is_loading() {
        let vm = view_model(Arc::default(), StaticConnectivity::online()).await;
        assert!(vm.state(FeedKind::BreakingNews).is_loading());
        assert!(vm.state(FeedKind::Search).is_loading());
    }

    #[tokio::test]
    async fn test_success_merges_and_advances() {
        let source = Arc::new(ScriptedSource::with(vec![
            Ok(page("p1", 20, 100)),
            Ok(page("p2", 20, 100)),
        ]));
        let vm = view_model(source.clone(), StaticConnectivity::online()).await;
        let cancel = CancellationToken::new();

        assert_eq!(vm.breaking_news("us", &cancel).await, PageRequest::Completed);
        assert_eq!(article_count(&vm.state(FeedKind::BreakingNews)), 20);
        assert_eq!(vm.cursor(FeedKind::BreakingNews).await.page, 2);

        assert_eq!(vm.breaking_news("us", &cancel).await, PageRequest::Completed);
        let state = vm.state(FeedKind::BreakingNews);
        assert_eq!(article_count(&state), 40);
        assert_eq!(vm.cursor(FeedKind::BreakingNews).await.page, 3);
        assert_eq!(
            source.calls(),
            vec![("us".to_string(), 1), ("us".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_offline_publishes_error_and_keeps_page() {
        let source = Arc::new(ScriptedSource::default());
        let vm = view_model(source.clone(), StaticConnectivity::offline()).await;

        vm.breaking_news("us", &CancellationToken::new()).await;
        let state = vm.state(FeedKind::BreakingNews);
        assert_eq!(state.message(), Some(NO_CONNECTION_MESSAGE));
        assert_eq!(vm.cursor(FeedKind::BreakingNews).await.page, 1);
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let source = Arc::new(ScriptedSource::with(vec![
            Err(SourceError::unsuccessful(Some(426), "Upgrade Required")),
            Err(SourceError::Conversion("bad json".into())),
        ]));
        let vm = view_model(source, StaticConnectivity::online()).await;
        let cancel = CancellationToken::new();

        vm.search_news("rust", &cancel).await;
        assert_eq!(
            vm.state(FeedKind::Search).message(),
            Some("Upgrade Required")
        );

        vm.search_news("rust", &cancel).await;
        assert_eq!(
            vm.state(FeedKind::Search).message(),
            Some(CONVERSION_ERROR_MESSAGE)
        );
        assert_eq!(vm.cursor(FeedKind::Search).await.page, 1);
    }

    #[tokio::test]
    async fn test_io_failure_is_network_failure() {
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let source = Arc::new(ScriptedSource::with(vec![Err(reset.into())]));
        let vm = view_model(source, StaticConnectivity::online()).await;

        vm.breaking_news("us", &CancellationToken::new()).await;
        let state = vm.state(FeedKind::BreakingNews);
        assert_eq!(state.message(), Some(NETWORK_FAILURE_MESSAGE));
        assert!(state.data().is_none());
        assert_eq!(vm.cursor(FeedKind::BreakingNews).await.page, 1);
    }

    #[tokio::test]
    async fn test_error_after_success_keeps_stale_data() {
        let source = Arc::new(ScriptedSource::with(vec![
            Ok(page("p1", 5, 5)),
            Err(SourceError::unsuccessful(Some(500), "Internal Server Error")),
        ]));
        let vm = view_model(source, StaticConnectivity::online()).await;
        let cancel = CancellationToken::new();

        vm.breaking_news("us", &cancel).await;
        vm.breaking_news("us", &cancel).await;

        let state = vm.state(FeedKind::BreakingNews);
        assert_eq!(state.message(), Some("Internal Server Error"));
        assert_eq!(article_count(&state), 5);
        assert_eq!(vm.cursor(FeedKind::BreakingNews).await.page, 2);
    }

    #[tokio::test]
    async fn test_parameter_change_resets_cursor() {
        let source = Arc::new(ScriptedSource::with(vec![
            Ok(page("us", 20, 40)),
            Ok(page("de", 3, 3)),
        ]));
        let vm = view_model(source.clone(), StaticConnectivity::online()).await;
        let cancel = CancellationToken::new();

        vm.breaking_news("us", &cancel).await;
        vm.breaking_news("de", &cancel).await;

        assert_eq!(article_count(&vm.state(FeedKind::BreakingNews)), 3);
        assert_eq!(
            source.calls(),
            vec![("us".to_string(), 1), ("de".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_cancelled_first_request_leaves_fresh_cursor() {
        let source = Arc::new(ScriptedSource::default());
        let vm = view_model(source, StaticConnectivity::online()).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        vm.search_news("rust", &cancel).await;
        assert_eq!(vm.cursor(FeedKind::Search).await, FeedCursor::default());
    }

    #[tokio::test]
    async fn test_offline_parameter_change_drops_old_results() {
        let source = Arc::new(ScriptedSource::with(vec![Ok(page("us", 20, 40))]));
        let online = view_model(source, StaticConnectivity::online()).await;
        let cancel = CancellationToken::new();
        online.breaking_news("us", &cancel).await;

        // Same state machine, now offline
        let NewsViewModel { breaking_news, store, source, .. } = online;
        let vm = NewsViewModel {
            source,
            store,
            connectivity: StaticConnectivity::offline(),
            breaking_news,
            search: FeedSlot::new(),
        };

        vm.breaking_news("us", &cancel).await;
        assert_eq!(article_count(&vm.state(FeedKind::BreakingNews)), 20);

        vm.breaking_news("de", &cancel).await;
        let state = vm.state(FeedKind::BreakingNews);
        assert_eq!(state.message(), Some(NO_CONNECTION_MESSAGE));
        assert!(state.data().is_none());
        let cursor = vm.cursor(FeedKind::BreakingNews).await;
        assert_eq!(cursor.page, 1);
        assert_eq!(cursor.parameter.as_deref(), Some("de"));
    }

    #[tokio::test]
    async fn test_feeds_are_independent() {
        let source = Arc::new(ScriptedSource::with(vec![Ok(page("q", 4, 4))]));
        let vm = view_model(source, StaticConnectivity::online()).await;
        let breaking = vm.subscribe(FeedKind::BreakingNews);

        vm.search_news("rust", &CancellationToken::new()).await;

        assert_eq!(article_count(&vm.state(FeedKind::Search)), 4);
        assert!(!breaking.has_changed().unwrap());
        assert_eq!(vm.cursor(FeedKind::BreakingNews).await.page, 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_publishes_nothing() {
        let source = Arc::new(ScriptedSource::with(vec![Ok(page("p", 1, 1))]));
        let vm = view_model(source.clone(), StaticConnectivity::online()).await;
        let rx = vm.subscribe(FeedKind::BreakingNews);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(vm.breaking_news("us", &cancel).await, PageRequest::Cancelled);
        assert!(!rx.has_changed().unwrap());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_delete_article() {
        let vm = view_model(Arc::default(), StaticConnectivity::online()).await;
        let saved = vm.saved_articles();
        let a = article("https://example.com/keep");

        vm.save_article(&a).await;
        vm.save_article(&a).await;
        assert_eq!(saved.borrow().len(), 1);

        vm.delete_article(&a).await;
        assert!(saved.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_is_swallowed() {
        let vm = view_model(Arc::default(), StaticConnectivity::online()).await;
        let mut bad = article("https://example.com/x");
        bad.url = "not a url".to_string();

        vm.save_article(&bad).await;
        assert!(vm.saved_articles().borrow().is_empty());
    }
}
