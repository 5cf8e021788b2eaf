//! Store-backed checks against a PostGIS database.
//!
//! Run only when `DB_URL` is set; they recreate the role tables and
//! functions, so never point them at a database that serves readers.
use centroids::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio_postgres::Client;

static STORE: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

const RESET: &str = "
    CREATE EXTENSION IF NOT EXISTS postgis;
    DROP FUNCTION IF EXISTS find_closest_places(DOUBLE PRECISION, DOUBLE PRECISION);
    DROP FUNCTION IF EXISTS find_closest_places_geo(DOUBLE PRECISION, DOUBLE PRECISION);
    DROP TABLE IF EXISTS onspd_centroids_prepare, onspd_centroids_ready, onspd_centroids_swap;
";

/// (objectid, long, lat) spread across Great Britain.
const PLACES: [(i32, f64, f64); 6] = [
    (1, -0.127600, 51.507200),
    (2, -2.244600, 53.483900),
    (3, -3.188300, 55.953300),
    (4, -1.890400, 52.486200),
    (5, -2.587900, 51.454500),
    (6, -4.251800, 55.864200),
];

async fn store() -> Option<Arc<Client>> {
    let url = std::env::var("DB_URL").ok()?;
    let client = connect(&url, CONNECT_TIMEOUT).await.expect("connect");
    client.batch_execute(RESET).await.expect("reset");
    Some(client)
}

fn raw(id: i32, long: f64, lat: f64) -> RawRecord {
    RawRecord {
        id: Some(id.to_string()),
        pcd2: Some(format!("PC{} 1AA", id)),
        dointr: Some(format!("{}", 199000 + id * 100 + 1)),
        doterm: None,
        oscty: Some(if id % 2 == 0 { "E99999999" } else { "S99999999" }.to_owned()),
        lat: Some(format!("{:.6}", lat)),
        long: Some(format!("{:.6}", long)),
    }
}

fn snapshot() -> Vec<RawRecord> {
    PLACES.iter().map(|&(id, long, lat)| raw(id, long, lat)).collect()
}

async fn located(client: &Client, id: i32) -> (Decimal, Decimal, String) {
    let row = client
        .query_one(
            "SELECT lat, long, pcd2 FROM onspd_centroids_prepare WHERE objectid = $1",
            &[&id],
        )
        .await
        .expect("select centroid");
    (row.get(0), row.get(1), row.get(2))
}

#[tokio::test]
async fn ignore_keeps_and_upsert_overwrites() {
    let _guard = STORE.lock().await;
    let Some(client) = store().await else { return };
    Pipeline::new(client.clone()).schema().await.expect("schema");
    let loader = Loader::default();
    let mut moved = raw(1, -0.5, 52.0);
    moved.pcd2 = Some("ZZ9 9ZZ".to_owned());
    let (first, _) = transform(vec![raw(1, -0.1276, 51.5072)]);
    let (second, _) = transform(vec![moved]);
    let original = (
        Decimal::new(51_507_200, 6),
        Decimal::new(-127_600, 6),
        "PC1 1AA".to_owned(),
    );

    assert_eq!(loader.load(&client, &first, Role::Prepare, &Conflict::Ignore).await.expect("load"), 1);
    assert_eq!(loader.load(&client, &second, Role::Prepare, &Conflict::Ignore).await.expect("ignore"), 0);
    assert_eq!(located(&client, 1).await, original);

    let upsert = Conflict::upsert(vec![Column::Lat, Column::Long]);
    assert_eq!(loader.load(&client, &second, Role::Prepare, &upsert).await.expect("upsert"), 1);
    assert_eq!(
        located(&client, 1).await,
        (Decimal::new(52_000_000, 6), Decimal::new(-500_000, 6), original.2)
    );
    assert_eq!(client.status().await.expect("status").prepare, Some(1));
}

#[tokio::test]
async fn repeated_key_in_one_batch_keeps_first_row() {
    let _guard = STORE.lock().await;
    let Some(client) = store().await else { return };
    Pipeline::new(client.clone()).schema().await.expect("schema");
    let mut moved = raw(1, -0.5, 52.0);
    moved.pcd2 = Some("ZZ9 9ZZ".to_owned());
    let (batch, _) = transform(vec![raw(1, -0.1276, 51.5072), moved]);
    assert_eq!(batch.len(), 2);

    let n = Loader::default()
        .load(&client, &batch, Role::Prepare, &Conflict::Ignore)
        .await
        .expect("load");
    assert_eq!(n, 1);
    assert_eq!(
        located(&client, 1).await,
        (Decimal::new(51_507_200, 6), Decimal::new(-127_600, 6), "PC1 1AA".to_owned())
    );
}

#[tokio::test]
async fn repeated_key_in_one_batch_merges_updated_columns() {
    let _guard = STORE.lock().await;
    let Some(client) = store().await else { return };
    Pipeline::new(client.clone()).schema().await.expect("schema");
    let mut moved = raw(1, -0.5, 52.0);
    moved.pcd2 = Some("ZZ9 9ZZ".to_owned());
    let (batch, _) = transform(vec![raw(1, -0.1276, 51.5072), moved]);

    let upsert = Conflict::upsert(vec![Column::Lat, Column::Long]);
    let n = Loader::default()
        .load(&client, &batch, Role::Prepare, &upsert)
        .await
        .expect("upsert");
    assert_eq!(n, 1);
    assert_eq!(
        located(&client, 1).await,
        (Decimal::new(52_000_000, 6), Decimal::new(-500_000, 6), "PC1 1AA".to_owned())
    );
    assert_eq!(client.status().await.expect("status").prepare, Some(1));
}

#[tokio::test]
async fn geodesic_ranking_matches_great_circle() {
    let _guard = STORE.lock().await;
    let Some(client) = store().await else { return };
    Pipeline::new(client.clone())
        .cycle(snapshot(), Phase::Schema)
        .await
        .expect("cycle");
    let here = (-1.0, 53.5);
    let places = client.nearest(Metric::Geodesic, here.0, here.1).await.expect("nearest");
    let mut expected = PLACES.to_vec();
    expected.sort_by(|a, b| haversine(here, (a.1, a.2)).total_cmp(&haversine(here, (b.1, b.2))));
    expected.truncate(DEFAULT_NEIGHBORS.get() as usize);
    assert_eq!(
        places.iter().map(|p| p.objectid).collect::<Vec<_>>(),
        expected.iter().map(|p| p.0).collect::<Vec<_>>()
    );
    for (place, &(_, long, lat)) in places.iter().zip(&expected) {
        let km = haversine(here, (long, lat));
        assert!((place.distance - km).abs() / km < 0.01, "{:?} vs {}", place, km);
    }
    let planar = client.nearest(Metric::Planar, here.0, here.1).await.expect("planar");
    assert_eq!(planar.len(), expected.len());
    assert!(planar.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[tokio::test]
async fn reprovisioning_is_idempotent() {
    let _guard = STORE.lock().await;
    let Some(client) = store().await else { return };
    Pipeline::new(client.clone())
        .cycle(snapshot(), Phase::Schema)
        .await
        .expect("cycle");
    let here = (-3.0, 55.0);
    let before = client.nearest(Metric::Geodesic, here.0, here.1).await.expect("before");
    client.provision(Role::Ready, DEFAULT_NEIGHBORS).await.expect("first");
    client.provision(Role::Ready, DEFAULT_NEIGHBORS).await.expect("second");
    let after = client.nearest(Metric::Geodesic, here.0, here.1).await.expect("after");
    assert_eq!(before, after);
    let indexes = client
        .query_one(
            "SELECT COUNT(*) FROM pg_indexes WHERE tablename = 'onspd_centroids_ready' AND indexdef LIKE '%gist%'",
            &[],
        )
        .await
        .expect("indexes")
        .get::<_, i64>(0);
    assert_eq!(indexes, 1);
    let status = client.status().await.expect("status");
    assert!(status.serving());
    assert_eq!(status.ready, Some(PLACES.len() as u64));
    assert_eq!(status.prepare, Some(0));
}

#[tokio::test]
async fn failed_swap_keeps_previous_generation() {
    let _guard = STORE.lock().await;
    let Some(client) = store().await else { return };
    let pipeline = Pipeline::new(client.clone());
    pipeline.cycle(snapshot(), Phase::Schema).await.expect("cycle");
    pipeline
        .stage(&transform(vec![raw(7, -1.0, 52.0)]).0)
        .await
        .expect("stage");
    // staging is loaded but unprovisioned, so its index rename fails
    assert!(matches!(pipeline.cycle(Vec::new(), Phase::Swap).await, Err(Error::Ddl { .. })));
    let status = client.status().await.expect("status");
    assert_eq!(status.ready, Some(PLACES.len() as u64));
    assert_eq!(status.prepare, Some(1));
    assert!(status.serving());
}
