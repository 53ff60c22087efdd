mod common;

use common::spawn_fake_api;
use policytrack::api::{AnalyticsRange, ApiClient, ApiError};
use policytrack::promotion::{CustomFilterDef, FilterKind, PolicyDraft, PromotionRequest};
use policytrack::store::{CartService, LocalStore};
use std::sync::Arc;
use std::time::Duration;

async fn client() -> (ApiClient, common::Shared) {
    let (base_url, state) = spawn_fake_api().await;
    let client = ApiClient::new(&base_url, Duration::from_secs(5)).unwrap();
    (client, state)
}

#[tokio::test]
async fn test_search_matches_query_case_insensitively() {
    let (client, _) = client().await;

    let results = client.search_policies("TERM").await.unwrap();
    let ids: Vec<_> = results.iter().map(|p| p.policy_id.as_str()).collect();
    assert_eq!(ids, vec!["P1", "P3"]);
    assert!(results.iter().all(|p| p.matches_query("term")));

    let all = client.search_policies("").await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_policy_amounts_decode() {
    let (client, _) = client().await;

    let p1 = client.find_policy("P1").await.unwrap().unwrap();
    assert_eq!(p1.premium(), Some(12000.0));
    assert_eq!(p1.sum_assured.as_ref().and_then(|a| a.value()), Some(10_000_000.0));
    assert_eq!(p1.target_groups(), vec!["Young Professionals", "Families"]);

    let p3 = client.find_policy("P3").await.unwrap().unwrap();
    assert_eq!(p3.premium(), Some(50_000.0));
    assert_eq!(p3.target_groups(), vec!["General"]);

    assert!(client.find_policy("P999").await.unwrap().is_none());
}

#[tokio::test]
async fn test_recommendations_respect_top_n() {
    let (client, _) = client().await;

    let policies = client.recommend_policies("C1", Some(2)).await.unwrap();
    assert_eq!(policies.len(), 2);
    assert!(policies[0].score.unwrap() > policies[1].score.unwrap());
}

#[tokio::test]
async fn test_cart_round_trip() {
    let (client, _) = client().await;
    let store = Arc::new(LocalStore::open_in_memory().unwrap());
    let cart = CartService::new(client.clone(), Arc::clone(&store));

    let item = cart.add("C1", "P2").await.unwrap().unwrap();
    assert_eq!(item.policy_name, "Family Health Plus");
    // Adding twice keeps one entry on both sides.
    cart.add("C1", "P2").await.unwrap();

    let server = cart.server_cart("C1").await.unwrap();
    assert_eq!(server.items.iter().filter(|i| i.policy_id == "P2").count(), 1);
    assert_eq!(server.total_premium(), 18500.0);
    assert_eq!(cart.local_items().unwrap().len(), 1);

    cart.remove("C1", "P2").await.unwrap();
    assert!(!cart.server_cart("C1").await.unwrap().contains("P2"));
    assert!(cart.local_items().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_clears_local_cart() {
    let (client, _) = client().await;
    let store = Arc::new(LocalStore::open_in_memory().unwrap());
    let cart = CartService::new(client, store);

    cart.add("C2", "P1").await.unwrap();
    cart.add("C2", "P3").await.unwrap();
    assert_eq!(cart.local_items().unwrap().len(), 2);

    let response = cart.checkout("C2").await.unwrap();
    assert_eq!(response["purchased"].as_array().unwrap().len(), 2);
    assert!(cart.local_items().unwrap().is_empty());
    assert!(cart.server_cart("C2").await.unwrap().items.is_empty());
}

#[tokio::test]
async fn test_rejected_add_leaves_local_cart_alone() {
    let (client, _) = client().await;
    let cart = CartService::new(client, Arc::new(LocalStore::open_in_memory().unwrap()));

    let err = cart.add("C1", "P404").await.unwrap_err();
    assert!(err.to_string().contains("404"));
    assert!(cart.local_items().unwrap().is_empty());
}

#[tokio::test]
async fn test_analytics_report_decodes() {
    let (client, _) = client().await;

    let report = client.analytics(AnalyticsRange::Month).await.unwrap();
    assert_eq!(report.metrics.total_customers, 1200);
    assert_eq!(
        report.policy_performance.points(),
        vec![("Term", 120.0), ("Health", 80.0), ("ULIP", 40.0)]
    );
    assert!(report.customer_segments.points().is_empty());
    assert_eq!(report.recent_activities[0].kind, "purchase");
}

#[tokio::test]
async fn test_custom_filter_lifecycle() {
    let (client, _) = client().await;
    assert!(client.list_custom_filters().await.unwrap().is_empty());

    let def = CustomFilterDef {
        filter_name: " Region ".into(),
        filter_type: FilterKind::Dropdown,
        filter_options: vec!["North".into(), "South".into()],
    }
    .validate()
    .unwrap();
    let created = client.create_custom_filter(&def).await.unwrap();
    assert_eq!(created.id, "1");
    assert_eq!(created.def.filter_name, "Region");

    assert_eq!(client.list_custom_filters().await.unwrap().len(), 1);
    client.delete_custom_filter(&created.id).await.unwrap();
    assert!(client.list_custom_filters().await.unwrap().is_empty());

    let err = client.delete_custom_filter(&created.id).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_promotion_and_policy_creation() {
    let (client, state) = client().await;

    let request = PromotionRequest {
        policy_ids: vec!["P1".into(), "P3".into()],
        preset_id: Some("abc".into()),
    };
    let response = client.promote_policies(&request).await.unwrap();
    assert_eq!(response["promoted"], 2);
    assert_eq!(state.lock().unwrap().promotions[0]["preset_id"], "abc");

    let draft = PolicyDraft {
        policy_name: "Smart Term".into(),
        sum_assured: "5000000".into(),
        premium_amount: "12000".into(),
        policy_duration_years: "20".into(),
        description: "Pure protection".into(),
        ..PolicyDraft::default()
    };
    draft.validate().unwrap();
    let created = client.create_policy(&draft).await.unwrap();
    assert_eq!(created["policy_name"], "Smart Term");
}

#[tokio::test]
async fn test_status_error_carries_body() {
    let (base_url, _) = spawn_fake_api().await;
    let client = ApiClient::new(&base_url, Duration::from_secs(5)).unwrap();

    let err = client.recommend_policies("", None).await.unwrap_err();
    match err {
        ApiError::Status { endpoint, status, .. } => {
            assert_eq!(endpoint, "/recommend_policies");
            assert_eq!(status, 400);
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let client = ApiClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    let err = client.search_policies("term").await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
