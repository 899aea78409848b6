//! Generate through the public API against a file-backed store

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use perpetual_ideas::generator::document::{hash_preview, sha256_hex};
use perpetual_ideas::generator::{CompletionProvider, Generator};
use perpetual_ideas::{DomainRegistry, FixedClock, InventionStore, QueryEngine, SqliteStore};
use std::sync::Arc;

const COMPLETION: &str = "TITLE: Graded Porosity Ceramic Foam\n\n\
ABSTRACT: A ceramic foam whose pore size varies continuously through its thickness.\n\n\
TECHNICAL FIELD: Materials science.\n\n\
DETAILED DESCRIPTION: Slurry layers with increasing pore-former content are cast and co-fired.\n\n\
CLAIMS:\n1. A ceramic foam with a monotonic porosity gradient.";

struct FakeProvider;

#[async_trait]
impl CompletionProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn complete(&self, _prompt: &str) -> perpetual_ideas::Result<String> {
        Ok(COMPLETION.to_string())
    }
}

#[tokio::test]
async fn test_generate_then_fetch_materials_science() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(&dir.path().join("inventions.db")).unwrap());
    store.init().await.unwrap();

    let now = Utc.with_ymd_and_hms(2025, 11, 3, 14, 5, 9).unwrap();
    let generator = Generator::with_provider(Box::new(FakeProvider), store.clone())
        .with_clock(Arc::new(FixedClock(now)));
    let registry = DomainRegistry::builtin();
    let engine = QueryEngine::new(store.clone(), registry).with_generator(Arc::new(generator));

    let id = engine.generate("materials-science").await.unwrap();
    assert_eq!(id, "inv-20251103-140509");

    let record = store.get_by_id("materials-science", &id).await.unwrap().unwrap();
    assert_eq!(record.domain_name, registry.get("materials-science").unwrap().name);
    assert_eq!(record.title, "Graded Porosity Ceramic Foam");
    assert_eq!(record.created_at, now);

    assert!(record.content.contains(COMPLETION));
    assert!(record.content.contains(&hash_preview(COMPLETION)));
    assert_eq!(record.hash, sha256_hex(&record.content));
    assert_eq!(record.hash.len(), 64);

    let hits = engine.search("POROSITY").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].invention_id, id);

    let listing = store.list_by_domain("materials-science", None).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].date, now.date_naive());
}
