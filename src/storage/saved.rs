use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

use super::schema::Database;
use super::types::SavedArticleRow;
use crate::news::Article;
use crate::util::validate_article_url;

/// Maximum number of saved articles returned by a single query (OOM protection)
const MAX_SAVED_ARTICLES: i64 = 5000;

/// Persistent collection of saved articles, keyed by url.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert `article`, or replace the stored copy with the same url.
    async fn upsert(&self, article: &Article) -> Result<()>;

    /// Remove the article stored under `url`. Unknown urls are a no-op.
    async fn delete_by_url(&self, url: &str) -> Result<()>;

    /// Live, ordered view of every stored article.
    ///
    /// The receiver holds the current contents immediately and is updated
    /// after every successful write.
    fn observe_all(&self) -> watch::Receiver<Arc<Vec<Article>>>;
}

impl Database {
    // ========================================================================
    // Saved Article Operations
    // ========================================================================

    /// Save an article, replacing any stored copy with the same url.
    ///
    /// A replaced article keeps its original position in the saved list.
    ///
    /// # Errors
    ///
    /// Fails if the url is not an absolute http(s) URL, or on database errors.
    pub async fn upsert_article(&self, article: &Article) -> Result<()> {
        validate_article_url(&article.url)?;

        sqlx::query(
            r#"
            INSERT INTO saved_articles
                (url, source_name, author, title, description, url_to_image, published_at, content, saved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                source_name = excluded.source_name,
                author = excluded.author,
                title = excluded.title,
                description = excluded.description,
                url_to_image = excluded.url_to_image,
                published_at = excluded.published_at,
                content = excluded.content
        "#,
        )
        .bind(&article.url)
        .bind(article.source_name())
        .bind(&article.author)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.url_to_image)
        .bind(&article.published_at)
        .bind(&article.content)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        self.refresh_saved_view().await;
        Ok(())
    }

    /// Delete the saved article with this url.
    ///
    /// # Returns
    ///
    /// True if a row was removed.
    pub async fn delete_saved_article(&self, url: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM saved_articles WHERE url = ?")
            .bind(url)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            self.refresh_saved_view().await;
        }
        Ok(removed)
    }

    // ========================================================================
    // Saved Article Queries
    // ========================================================================

    /// All saved articles in the order they were first saved.
    pub async fn get_saved_articles(&self) -> Result<Vec<Article>> {
        let rows: Vec<SavedArticleRow> = sqlx::query_as(
            r#"
            SELECT url, source_name, author, title, description, url_to_image, published_at, content
            FROM saved_articles
            ORDER BY id
            LIMIT ?
        "#,
        )
        .bind(MAX_SAVED_ARTICLES)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SavedArticleRow::into_article).collect())
    }

    pub async fn is_saved(&self, url: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM saved_articles WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Re-read the table into the live view. On failure the previous
    /// contents stay published.
    async fn refresh_saved_view(&self) {
        match self.get_saved_articles().await {
            Ok(articles) => {
                self.saved_tx.send_replace(Arc::new(articles));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to refresh saved articles view");
            }
        }
    }
}

#[async_trait]
impl ArticleStore for Database {
    async fn upsert(&self, article: &Article) -> Result<()> {
        self.upsert_article(article).await
    }

    async fn delete_by_url(&self, url: &str) -> Result<()> {
        self.delete_saved_article(url).await.map(|_| ())
    }

    fn observe_all(&self) -> watch::Receiver<Arc<Vec<Article>>> {
        self.saved_tx.subscribe()
    }
}

#[async_trait]
impl<T: ArticleStore + ?Sized> ArticleStore for Arc<T> {
    async fn upsert(&self, article: &Article) -> Result<()> {
        (**self).upsert(article).await
    }

    async fn delete_by_url(&self, url: &str) -> Result<()> {
        (**self).delete_by_url(url).await
    }

    fn observe_all(&self) -> watch::Receiver<Arc<Vec<Article>>> {
        (**self).observe_all()
    }
}
