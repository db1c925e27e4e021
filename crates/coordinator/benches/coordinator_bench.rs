use coordinator::{CoordinatorConfig, DeliveryCoordinator};
use criterion::{Criterion, criterion_group, criterion_main};
use delivery_cache::{CacheKey, DeliveryCache, InMemoryCacheBackend};
use delivery_store::{InMemoryDeliveryStore, ShippingAddress};

type BenchCoordinator = DeliveryCoordinator<InMemoryDeliveryStore, InMemoryCacheBackend>;

fn coordinator() -> (BenchCoordinator, InMemoryCacheBackend) {
    let cache = InMemoryCacheBackend::new();
    let coordinator = DeliveryCoordinator::new(
        InMemoryDeliveryStore::new(),
        DeliveryCache::with_default_ttl(cache.clone()),
        CoordinatorConfig::default(),
    );
    (coordinator, cache)
}

fn address() -> ShippingAddress {
    ShippingAddress::new("1 Market St", "San Francisco", "CA", "US", "94105")
}

fn bench_create(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (coordinator, _) = coordinator();

    c.bench_function("coordinator/create", |b| {
        b.iter(|| {
            rt.block_on(async {
                coordinator.create("ORD-BENCH", &address()).await.unwrap();
            });
        });
    });
}

fn bench_get_cache_hit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (coordinator, _) = coordinator();
    let id = rt
        .block_on(coordinator.create("ORD-BENCH", &address()))
        .unwrap()
        .id
        .to_string();

    c.bench_function("coordinator/get_cache_hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                coordinator.get(&id).await.unwrap().unwrap();
            });
        });
    });
}

fn bench_get_cache_miss(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (coordinator, cache) = coordinator();
    let delivery = rt
        .block_on(coordinator.create("ORD-BENCH", &address()))
        .unwrap();
    let id = delivery.id.to_string();
    let key = CacheKey::Delivery(delivery.id);

    c.bench_function("coordinator/get_cache_miss", |b| {
        b.iter(|| {
            rt.block_on(async {
                cache.evict(&key).await;
                coordinator.get(&id).await.unwrap().unwrap();
            });
        });
    });
}

fn bench_track_with_history(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (coordinator, cache) = coordinator();

    // Delivery with 50 events
    let delivery = rt.block_on(async {
        let delivery = coordinator.create("ORD-BENCH", &address()).await.unwrap();
        let id = delivery.id.to_string();
        for i in 0..49 {
            coordinator
                .update(&id, &format!("HOP_{i}"), "Hub", "")
                .await
                .unwrap();
        }
        delivery
    });
    let events_key = CacheKey::Events(delivery.id);

    c.bench_function("coordinator/track_store_fallback_50_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                cache.evict(&events_key).await;
                let tracked = coordinator
                    .track(delivery.tracking_number.as_str())
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(tracked.events.len(), 50);
            });
        });
    });
}

fn bench_list_page(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (coordinator, _) = coordinator();

    // Pre-populate with 500 deliveries across 5 orders
    rt.block_on(async {
        for i in 0..500 {
            coordinator
                .create(&format!("ORD-{}", i % 5), &address())
                .await
                .unwrap();
        }
    });

    c.bench_function("coordinator/list_page_of_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                let page = coordinator.list("ORD-3", 1, 100).await.unwrap();
                assert_eq!(page.total, 100);
            });
        });
    });
}

criterion_group!(
    benches,
    bench_create,
    bench_get_cache_hit,
    bench_get_cache_miss,
    bench_track_with_history,
    bench_list_page,
);
criterion_main!(benches);
