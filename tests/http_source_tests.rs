use assert_matches::assert_matches;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use skincare_catalog::model::CategoryRef;
use skincare_catalog::{
    CatalogConfig, CatalogError, CatalogSource, CatalogStore, CategoryId, HttpCatalogSource,
    ProductId, Rating, StockStatus,
};
use tokio::net::TcpListener;

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub api");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub api");
    });
    format!("http://{addr}/api")
}

fn config_for(base: String) -> CatalogConfig {
    CatalogConfig {
        api_base_url: base,
        request_timeout_secs: 5,
        ..CatalogConfig::default()
    }
}

fn products_body() -> Value {
    json!([
        {
            "_id": "p-foam",
            "name": "Cleanser Foam",
            "brand": "Glowlab",
            "description": "Low pH daily cleanser",
            "sellingPrice": 100000,
            "salePercentage": "20",
            "images": ["https://cdn.example.com/foam-1.jpg", "https://cdn.example.com/foam-2.jpg"],
            "reviews": [{ "rating": 4, "comment": "gentle" }, { "rating": 5, "user": "rani" }],
            "categories": ["face"],
            "stock": 3
        },
        {
            "id": "p-cream",
            "name": "Moisturizer",
            "brand": "CleanCo",
            "sellingPrice": 50000,
            "salePercentage": 0,
            "categories": [{ "_id": "body", "name": "Body" }]
        }
    ])
}

fn categories_body() -> Value {
    json!([
        { "_id": "face", "name": "Face" },
        { "id": "body", "name": "Body" }
    ])
}

fn catalog_router() -> Router {
    Router::new()
        .route("/api/products", get(|| async { Json(products_body()) }))
        .route("/api/categories", get(|| async { Json(categories_body()) }))
}

#[tokio::test]
async fn decodes_backend_shapes() {
    let base = serve(catalog_router()).await;
    let source = HttpCatalogSource::new(&config_for(base)).unwrap();

    let products = source.fetch_products().await.unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].id, ProductId::new("p-foam"));
    assert_eq!(products[0].sale_percentage.as_deref(), Some("20"));
    assert_eq!(products[0].images.len(), 2);
    assert_eq!(products[0].reviews[1].author.as_deref(), Some("rani"));
    assert_eq!(
        products[0].categories,
        vec![CategoryRef::Id(CategoryId::new("face"))]
    );
    assert_eq!(products[1].sale_percentage.as_deref(), Some("0"));
    assert!(products[1].reviews.is_empty());
    assert_eq!(products[1].stock, None);

    let categories = source.fetch_categories().await.unwrap();
    assert_eq!(categories[0].id, CategoryId::new("face"));
    assert_eq!(categories[1].name, "Body");
}

#[tokio::test]
async fn store_loads_over_http() {
    let base = serve(catalog_router()).await;
    let store = CatalogStore::from_config(&config_for(base)).unwrap();

    let snapshot = store.load().await.unwrap();
    let foam = snapshot.find_by_id(&ProductId::new("p-foam")).unwrap();
    assert_eq!(foam.discounted_price, 80_000.0);
    assert_eq!(foam.average_rating, Rating::Stars(4.5));
    assert_eq!(foam.stock_status, StockStatus::LowStock);

    let cream = snapshot.find_by_id(&ProductId::new("p-cream")).unwrap();
    assert_eq!(cream.discounted_price, 50_000.0);
    assert_eq!(cream.average_rating, Rating::Unrated);
    assert_eq!(cream.stock_status, StockStatus::OutOfStock);

    assert_eq!(snapshot.sale_products().len(), 1);
    assert_eq!(snapshot.search("body").len(), 1);
    assert_eq!(snapshot.search("ph daily").len(), 1);
}

#[tokio::test]
async fn accepts_enveloped_lists() {
    let router = Router::new()
        .route(
            "/api/products",
            get(|| async { Json(json!({ "data": products_body() })) }),
        )
        .route(
            "/api/categories",
            get(|| async { Json(json!({ "data": [] })) }),
        );
    let base = serve(router).await;
    let source = HttpCatalogSource::new(&config_for(base)).unwrap();

    assert_eq!(source.fetch_products().await.unwrap().len(), 2);
    assert!(source.fetch_categories().await.unwrap().is_empty());
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let router = Router::new()
        .route(
            "/api/products",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        )
        .route("/api/categories", get(|| async { Json(categories_body()) }));
    let base = serve(router).await;
    let store = CatalogStore::from_config(&config_for(base)).unwrap();

    let error = store.load().await.unwrap_err();
    assert_eq!(
        error,
        CatalogError::Status {
            resource: "products".into(),
            status: 503
        }
    );
    assert_eq!(store.error().unwrap().category, "status");
    assert!(store.state().products().is_empty());
}

#[tokio::test]
async fn malformed_payload_is_a_decode_error() {
    let router = Router::new()
        .route("/api/products", get(|| async { Json(products_body()) }))
        .route(
            "/api/categories",
            get(|| async { Json(json!({ "unexpected": true })) }),
        );
    let base = serve(router).await;
    let source = HttpCatalogSource::new(&config_for(base)).unwrap();

    assert_matches!(
        source.fetch_categories().await,
        Err(CatalogError::Decode { resource, .. }) if resource == "categories"
    );
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = HttpCatalogSource::new(&config_for(format!("http://{addr}/api"))).unwrap();
    assert_matches!(
        source.fetch_products().await,
        Err(CatalogError::Transport { .. })
    );
}

#[test]
fn urls_follow_configured_paths() {
    let config = CatalogConfig {
        api_base_url: "https://shop.example.com/v2/".into(),
        products_path: "/catalog/items".into(),
        categories_path: "catalog/groups".into(),
        ..CatalogConfig::default()
    };
    let source = HttpCatalogSource::new(&config).unwrap();
    assert_eq!(source.products_url(), "https://shop.example.com/v2/catalog/items");
    assert_eq!(source.categories_url(), "https://shop.example.com/v2/catalog/groups");
}
