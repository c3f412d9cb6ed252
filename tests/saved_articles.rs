//! Integration tests for saving and deleting articles through the view-model.
//!
//! Each test creates its own in-memory SQLite database for isolation.

use headlines::connectivity::StaticConnectivity;
use headlines::feed::NewsViewModel;
use headlines::news::{Article, NewsApiClient, Source};
use headlines::storage::Database;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use std::time::Duration;

async fn test_vm() -> NewsViewModel<NewsApiClient, Database, StaticConnectivity> {
    let client = NewsApiClient::new(
        "http://127.0.0.1:9",
        SecretString::from("unused"),
        Duration::from_secs(1),
    )
    .unwrap();
    let db = Database::open(":memory:").await.unwrap();
    NewsViewModel::new(client, db, StaticConnectivity::online())
}

fn test_article(slug: &str) -> Article {
    Article {
        source: Some(Source::from_name("Daily")),
        author: None,
        title: format!("Story {}", slug),
        description: Some("Summary".to_string()),
        url: format!("https://news.example.com/{}", slug),
        url_to_image: Some(format!("https://news.example.com/{}.png", slug)),
        published_at: "2024-06-01T09:15:00Z".to_string(),
        content: None,
    }
}

fn saved_urls(vm: &NewsViewModel<NewsApiClient, Database, StaticConnectivity>) -> Vec<String> {
    vm.saved_articles()
        .borrow()
        .iter()
        .map(|a| a.url.clone())
        .collect()
}

#[tokio::test]
async fn test_repeated_save_stores_once() {
    let vm = test_vm().await;
    let article = test_article("a");

    for _ in 0..3 {
        vm.save_article(&article).await;
    }

    assert_eq!(saved_urls(&vm), vec![article.url.clone()]);
}

#[tokio::test]
async fn test_saved_copy_round_trips_fields() {
    let vm = test_vm().await;
    let article = test_article("a");
    vm.save_article(&article).await;

    let saved = vm.saved_articles().borrow().clone();
    assert_eq!(saved[0], article);
}

#[tokio::test]
async fn test_delete_removes_only_matching_url() {
    let vm = test_vm().await;
    let keep = test_article("keep");
    let gone = test_article("gone");
    vm.save_article(&keep).await;
    vm.save_article(&gone).await;

    // A different copy with the same url still deletes the stored article
    let mut same_url = gone.clone();
    same_url.title = "Edited".to_string();
    vm.delete_article(&same_url).await;

    assert_eq!(saved_urls(&vm), vec![keep.url]);
}

#[tokio::test]
async fn test_delete_unsaved_article_is_noop() {
    let vm = test_vm().await;
    vm.save_article(&test_article("a")).await;
    vm.delete_article(&test_article("never-saved")).await;

    assert_eq!(saved_urls(&vm).len(), 1);
}

#[tokio::test]
async fn test_live_view_notifies_subscribers() {
    let vm = test_vm().await;
    let mut rx = vm.saved_articles();
    assert!(rx.borrow_and_update().is_empty());

    vm.save_article(&test_article("a")).await;
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().len(), 1);

    vm.delete_article(&test_article("a")).await;
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().is_empty());
}

#[tokio::test]
async fn test_saved_order_is_first_saved_order() {
    let vm = test_vm().await;
    for slug in ["one", "two", "three"] {
        vm.save_article(&test_article(slug)).await;
    }
    vm.save_article(&test_article("one")).await;

    assert_eq!(
        saved_urls(&vm),
        vec![
            "https://news.example.com/one".to_string(),
            "https://news.example.com/two".to_string(),
            "https://news.example.com/three".to_string(),
        ]
    );
}
