//! Caches and token records surviving a process restart.

#![allow(clippy::unwrap_used, clippy::unreadable_literal)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use opsdesk_auth::{TokenEndpoint, TokenGrant};
use opsdesk_core::{
    EmailFilters, EmailStore, FileStore, Folder, ListCache, MockClock, SharedStore, TokenStore,
};

const NOW: i64 = 1_700_000_000_000;

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("opsdesk-persist-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir.join("storage.json")
}

fn reopen(path: &Path) -> SharedStore {
    Arc::new(FileStore::open(path).unwrap())
}

#[test]
fn test_email_cache_survives_reopen_until_ttl() {
    let path = scratch("emails");
    let clock = Arc::new(MockClock::at_millis(NOW));

    let store = EmailStore::new(reopen(&path), clock.clone());
    store.set("a", &"first".to_string(), Folder::Inbox);
    store.set("a", &"second".to_string(), Folder::Inbox);
    drop(store);

    let store = EmailStore::new(reopen(&path), clock.clone());
    assert_eq!(store.index().inbox, vec!["a".to_string()]);
    assert_eq!(store.get::<String>("a").as_deref(), Some("second"));

    clock.advance_millis(299_999);
    assert!(store.contains("a"));
    clock.advance_millis(1);
    assert!(!store.contains("a"));
    assert!(store.get::<String>("a").is_none());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_list_cache_survives_reopen() {
    let path = scratch("lists");
    let clock = Arc::new(MockClock::at_millis(NOW));
    let filters = EmailFilters::default().with_search("bol").with_limit(2);

    ListCache::new(reopen(&path), clock.clone()).set(Folder::Sent, &filters, &[3u32, 1]);

    let lists = ListCache::new(reopen(&path), clock.clone());
    assert_eq!(lists.get::<u32>(Folder::Sent, &filters), Some(vec![3, 1]));
    assert_eq!(lists.get::<u32>(Folder::Inbox, &filters), None);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

struct FixedEndpoint;

impl TokenEndpoint for FixedEndpoint {
    fn name(&self) -> &str {
        "walmart"
    }

    async fn request_token(&self) -> opsdesk_auth::Result<TokenGrant> {
        Ok(TokenGrant::new("persisted", "Bearer", 900))
    }
}

#[tokio::test]
async fn test_token_record_survives_reopen() {
    let path = scratch("tokens");
    let clock = Arc::new(MockClock::at_millis(NOW));

    let store = TokenStore::new(FixedEndpoint, reopen(&path), clock.clone());
    assert!(store.refresh().await);
    drop(store);

    let store = TokenStore::new(FixedEndpoint, reopen(&path), clock.clone());
    let record = store.token().unwrap();
    assert_eq!(record.token, "persisted");
    assert_eq!(record.timestamp, NOW);
    assert!(store.is_valid());

    clock.advance_millis(840_000);
    assert!(store.is_expired(None));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
