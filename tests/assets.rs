pub mod common;

use helpdesk::api::{
    self,
    asset::{ChangeType, Snapshot, Status},
    user::Role,
};
use reqwest::StatusCode;
use serde_json::json;

fn laptop() -> serde_json::Value {
    json!({
        "assetTag": "AST-001",
        "serialNumber": "DXPS15-001",
        "type": "Laptop",
        "brand": "Dell",
        "model": "XPS 15",
        "location": "HQ Floor 2",
        "purchaseDate": "2023-01-15",
    })
}

#[tokio::test]
async fn creates_asset_in_stock() {
    let base_url = common::spawn_app().await;
    let (admin, _) =
        common::Client::signed_up(&base_url, "Ada", Role::Admin).await;

    let asset = admin.create_asset(&laptop()).await.unwrap();
    assert_eq!(asset.asset_tag, "AST-001");
    assert_eq!(asset.kind.as_deref(), Some("Laptop"));
    assert_eq!(asset.status, Status::InStock);
    assert_eq!(asset.assigned_to, None);

    let details = admin.get_asset(asset.id).await.unwrap();
    assert_eq!(details.asset.id, asset.id);
    assert!(details.history.is_empty());
    assert!(details.tickets.is_empty());
}

#[tokio::test]
async fn rejects_duplicate_tag() {
    let base_url = common::spawn_app().await;
    let (admin, _) =
        common::Client::signed_up(&base_url, "Ada", Role::Admin).await;

    admin.create_asset(&laptop()).await.unwrap();
    assert_eq!(
        admin.create_asset(&laptop()).await.unwrap_err(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(admin.list_assets("").await.unwrap().len(), 1);
}

#[tokio::test]
async fn only_admins_create_assets() {
    let base_url = common::spawn_app().await;
    let (tech, _) =
        common::Client::signed_up(&base_url, "Tom", Role::Tech).await;

    assert_eq!(
        tech.create_asset(&laptop()).await.unwrap_err(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn accepts_legacy_status_names() {
    let base_url = common::spawn_app().await;
    let (admin, _) =
        common::Client::signed_up(&base_url, "Ada", Role::Admin).await;

    let mut body = laptop();
    body["status"] = json!("IN_USE");
    let asset = admin.create_asset(&body).await.unwrap();
    assert_eq!(asset.status, Status::Assigned);

    let listed = admin.list_assets("status=AVAILABLE").await.unwrap();
    assert!(listed.is_empty());
    let listed = admin.list_assets("status=ASSIGNED").await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn filters_assets() {
    let base_url = common::spawn_app().await;
    let (admin, _) =
        common::Client::signed_up(&base_url, "Ada", Role::Admin).await;

    admin.create_asset(&laptop()).await.unwrap();
    admin
        .create_asset(&json!({
            "assetTag": "AST-002",
            "type": "Monitor",
            "location": "Warehouse",
            "status": "IN_REPAIR",
        }))
        .await
        .unwrap();

    let laptops = admin.list_assets("type=Laptop").await.unwrap();
    assert_eq!(laptops.len(), 1);
    assert_eq!(laptops[0].asset_tag, "AST-001");

    let hq = admin.list_assets("location=hq").await.unwrap();
    assert_eq!(hq.len(), 1);
    assert_eq!(hq[0].asset_tag, "AST-001");

    let in_repair = admin.list_assets("status=IN_REPAIR").await.unwrap();
    assert_eq!(in_repair.len(), 1);
    assert_eq!(in_repair[0].asset_tag, "AST-002");
}

#[tokio::test]
async fn update_records_one_history_entry() {
    let base_url = common::spawn_app().await;
    let (admin, _) =
        common::Client::signed_up(&base_url, "Ada", Role::Admin).await;
    let (tech, tech_me) =
        common::Client::signed_up(&base_url, "Tom", Role::Tech).await;

    let asset = admin.create_asset(&laptop()).await.unwrap();
    let updated = tech
        .update_asset(
            asset.id,
            &json!({ "status": "ASSIGNED", "assignedToId": tech_me.id }),
        )
        .await
        .unwrap();
    assert_eq!(updated.status, Status::Assigned);
    assert_eq!(updated.assigned_to.as_ref(), Some(&tech_me));
    assert_eq!(updated.brand.as_deref(), Some("Dell"));

    let history = tech.get_asset_history(asset.id).await.unwrap();
    assert_eq!(history.len(), 1);
    let entry = &history[0];
    assert_eq!(entry.asset_id, asset.id);
    assert_eq!(entry.changed_by, tech_me);
    assert_eq!(entry.change_type, ChangeType::UpdatedDetails);

    let old = serde_json::from_str::<Snapshot>(&entry.old_value).unwrap();
    let new = serde_json::from_str::<Snapshot>(&entry.new_value).unwrap();
    assert_eq!(old.status, Status::InStock);
    assert_eq!(old.assigned_to, None);
    assert_eq!(new.id, updated.id);
    assert_eq!(new.status, updated.status);
    assert_eq!(new.assigned_to, Some(tech_me.id));
    assert_eq!(new.location, updated.location);
    assert_eq!(new.updated_at, updated.updated_at);
}

#[tokio::test]
async fn null_clears_asset_assignee() {
    let base_url = common::spawn_app().await;
    let (admin, me) =
        common::Client::signed_up(&base_url, "Ada", Role::Admin).await;

    let mut body = laptop();
    body["assignedToId"] = json!(me.id);
    let asset = admin.create_asset(&body).await.unwrap();
    assert_eq!(asset.assigned_to.as_ref(), Some(&me));

    let asset = admin
        .update_asset(asset.id, &json!({ "location": "Lab" }))
        .await
        .unwrap();
    assert_eq!(asset.assigned_to.as_ref(), Some(&me));

    let asset = admin
        .update_asset(asset.id, &json!({ "assignedToId": null }))
        .await
        .unwrap();
    assert_eq!(asset.assigned_to, None);
    assert_eq!(asset.location.as_deref(), Some("Lab"));

    let history = admin.get_asset_history(asset.id).await.unwrap();
    assert_eq!(history.len(), 2);
    let newest = serde_json::from_str::<Snapshot>(&history[0].new_value)
        .unwrap();
    assert_eq!(newest.assigned_to, None);
}

#[tokio::test]
async fn users_cannot_update_assets() {
    let base_url = common::spawn_app().await;
    let (admin, _) =
        common::Client::signed_up(&base_url, "Ada", Role::Admin).await;
    let (user, _) =
        common::Client::signed_up(&base_url, "Uma", Role::User).await;

    let asset = admin.create_asset(&laptop()).await.unwrap();
    assert_eq!(
        user.update_asset(asset.id, &json!({ "status": "RETIRED" }))
            .await
            .unwrap_err(),
        StatusCode::FORBIDDEN
    );
    assert!(admin.get_asset_history(asset.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_asset_is_not_found() {
    let base_url = common::spawn_app().await;
    let (tech, _) =
        common::Client::signed_up(&base_url, "Tom", Role::Tech).await;
    let id = api::asset::Id::new();

    assert_eq!(tech.get_asset(id).await.unwrap_err(), StatusCode::NOT_FOUND);
    assert_eq!(
        tech.get_asset_history(id).await.unwrap_err(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        tech.update_asset(id, &json!({ "status": "RETIRED" }))
            .await
            .unwrap_err(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn asset_lists_its_tickets() {
    let base_url = common::spawn_app().await;
    let (admin, _) =
        common::Client::signed_up(&base_url, "Ada", Role::Admin).await;

    let asset = admin.create_asset(&laptop()).await.unwrap();
    let ticket = admin
        .create_ticket(&json!({
            "title": "Screen flickers",
            "description": "Flickers after wake",
            "category": "Hardware",
            "assetId": asset.id,
        }))
        .await
        .unwrap();
    let summary = ticket.asset.expect("asset not attached");
    assert_eq!(summary.asset_tag, "AST-001");

    let details = admin.get_asset(asset.id).await.unwrap();
    assert_eq!(details.tickets.len(), 1);
    assert_eq!(details.tickets[0].id, ticket.id);
    assert_eq!(details.tickets[0].title, "Screen flickers");
}
