pub mod common;

use helpdesk::api::{
    asset,
    stats::Bucket,
    ticket::{Priority, Status},
    user::Role,
};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn empty_overview_lists_every_bucket() {
    let base_url = common::spawn_app().await;
    let (tech, _) =
        common::Client::signed_up(&base_url, "Tom", Role::Tech).await;

    let overview = tech.stats_overview().await.unwrap();
    assert_eq!(overview.total_tickets, 0);
    assert_eq!(overview.open_tickets, 0);
    assert_eq!(overview.total_assets, 0);
    assert_eq!(overview.tickets_by_status.len(), Status::ALL.len());
    assert_eq!(overview.tickets_by_priority.len(), Priority::ALL.len());
    assert_eq!(overview.assets_by_status.len(), asset::Status::ALL.len());
    assert!(overview.tickets_by_status.iter().all(|b| b.value == 0));
}

#[tokio::test]
async fn overview_counts_live_data() {
    let base_url = common::spawn_app().await;
    let (admin, _) =
        common::Client::signed_up(&base_url, "Ada", Role::Admin).await;

    for (title, priority) in [("A", "LOW"), ("B", "HIGH"), ("C", "HIGH")] {
        admin
            .create_ticket(&json!({
                "title": title,
                "description": "Something broke",
                "category": "Other",
                "priority": priority,
            }))
            .await
            .unwrap();
    }
    let tickets = admin.list_tickets("priority=HIGH").await.unwrap();
    admin
        .update_ticket(tickets[0].id, &json!({ "status": "RESOLVED" }))
        .await
        .unwrap();
    admin
        .update_ticket(tickets[1].id, &json!({ "status": "CLOSED" }))
        .await
        .unwrap();
    admin
        .create_asset(&json!({ "assetTag": "AST-001", "status": "RETIRED" }))
        .await
        .unwrap();

    let overview = admin.stats_overview().await.unwrap();
    assert_eq!(overview.total_tickets, 3);
    assert_eq!(overview.open_tickets, 1);
    assert_eq!(overview.resolved_tickets, 1);
    assert_eq!(overview.total_assets, 1);
    assert!(overview.tickets_by_priority.contains(&Bucket {
        name: Priority::High,
        value: 2,
    }));
    assert!(overview.tickets_by_status.contains(&Bucket {
        name: Status::New,
        value: 1,
    }));
    assert!(overview.assets_by_status.contains(&Bucket {
        name: asset::Status::Retired,
        value: 1,
    }));
}

#[tokio::test]
async fn users_cannot_see_stats() {
    let base_url = common::spawn_app().await;
    let (user, _) =
        common::Client::signed_up(&base_url, "Uma", Role::User).await;

    assert_eq!(
        user.stats_overview().await.unwrap_err(),
        StatusCode::FORBIDDEN
    );
}
