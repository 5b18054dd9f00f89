mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{id_of, TestApp};

fn worn(detail: &Value) -> Vec<String> {
    let mut ids: Vec<String> = detail["items"]
        .as_array()
        .map(|items| items.iter().filter_map(|i| i["item_id"].as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    ids.sort();
    ids
}

fn sorted(values: &[&Value]) -> Vec<String> {
    let mut ids: Vec<String> = values.iter().filter_map(|v| v["id"].as_str().map(str::to_string)).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn outfit_items_follow_the_submitted_list() -> Result<()> {
    let app = TestApp::new();
    let user = Uuid::new_v4();
    let avatar = app.create("/api/avatars", user, json!({ "name": "Rusk" })).await?;
    let shirt = app.create("/api/items", user, json!({ "name": "Shirt", "category": "cloth" })).await?;
    let boots = app.create("/api/items", user, json!({ "name": "Boots", "category": "cloth" })).await?;
    let hat = app.create("/api/items", user, json!({ "name": "Hat", "category": "accessory" })).await?;

    let outfit = app
        .create(
            "/api/outfits",
            user,
            json!({
                "name": "Casual",
                "avatar_id": avatar["id"],
                "items": [{ "item_id": shirt["id"], "description": "tucked" }, { "item_id": boots["id"] }]
            }),
        )
        .await?;
    assert_eq!(worn(&outfit), sorted(&[&shirt, &boots]));
    let uri = format!("/api/outfits/{}", id_of(&outfit)?);

    let shirt_link = outfit["items"]
        .as_array()
        .and_then(|items| items.iter().find(|i| i["item_id"] == shirt["id"]))
        .cloned()
        .unwrap_or(Value::Null);
    let (status, body) = app
        .put(
            &uri,
            user,
            json!({ "items": [{ "id": shirt_link["id"], "item_id": shirt["id"] }, { "item_id": hat["id"] }] }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(worn(&body["data"]), sorted(&[&shirt, &hat]));

    let (_, body) = app.put(&uri, user, json!({ "name": "Weekend" })).await?;
    assert_eq!(body["data"]["name"], "Weekend");
    assert_eq!(worn(&body["data"]), sorted(&[&shirt, &hat]));

    let (_, body) = app.get(&uri, user).await?;
    assert_eq!(worn(&body["data"]), sorted(&[&shirt, &hat]));
    assert_eq!(app.db.row_count("outfit_items").await, 2);

    let (status, _) = app.delete(&uri, user).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.db.row_count("outfit_items").await, 0);
    Ok(())
}

#[tokio::test]
async fn outfit_items_must_be_distinct_and_owned() -> Result<()> {
    let app = TestApp::new();
    let user = Uuid::new_v4();
    let avatar = app.create("/api/avatars", user, json!({ "name": "Rusk" })).await?;
    let shirt = app.create("/api/items", user, json!({ "name": "Shirt" })).await?;
    let theirs = app.create("/api/items", Uuid::new_v4(), json!({ "name": "Cape" })).await?;

    let (status, body) = app
        .post(
            "/api/outfits",
            user,
            json!({
                "name": "Twice",
                "avatar_id": avatar["id"],
                "items": [{ "item_id": shirt["id"] }, { "item_id": shirt["id"] }]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let borrowed = json!({ "name": "Borrowed", "avatar_id": avatar["id"], "items": [{ "item_id": theirs["id"] }] });
    let (status, _) = app.post("/api/outfits", user, borrowed).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.db.row_count("outfits").await, 0);
    Ok(())
}

#[tokio::test]
async fn compatibility_upsert_then_update() -> Result<()> {
    let app = TestApp::new();
    let user = Uuid::new_v4();
    let avatar = app.create("/api/avatars", user, json!({ "name": "Rusk" })).await?;
    let item = app.create("/api/items", user, json!({ "name": "Shirt" })).await?;
    let pair = json!({ "avatar_id": avatar["id"], "item_id": item["id"] });

    let cell = |status: &str| json!({ "avatar_id": avatar["id"], "item_id": item["id"], "status": status });

    let (status, body) = app.post("/api/compatibility", user, cell("modified")).await?;
    assert_eq!(status, StatusCode::CREATED);
    let cell_id = body["data"]["id"].clone();

    let (status, body) = app.post("/api/compatibility", user, cell("official")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], cell_id);
    assert_eq!(body["data"]["status"], "official");

    let uri = format!("/api/compatibility/{}/{}", id_of(&avatar)?, id_of(&item)?);
    let (status, body) = app.put(&uri, user, json!({ "status": "unsupported", "note": "clips" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "unsupported");
    assert_eq!(body["data"]["note"], "clips");

    let (status, _) = app.put(&uri, Uuid::new_v4(), json!({ "status": "official" })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.put(&uri, user, json!({ "status": "perfect" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/compatibility?total=true", user).await?;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["avatar_id"], pair["avatar_id"]);
    Ok(())
}

#[tokio::test]
async fn matrix_returns_both_axes_and_cells() -> Result<()> {
    let app = TestApp::new();
    let user = Uuid::new_v4();
    let rusk = app.create("/api/avatars", user, json!({ "name": "Rusk" })).await?;
    app.create("/api/avatars", user, json!({ "name": "Manuka" })).await?;
    let shirt = app.create("/api/items", user, json!({ "name": "Shirt" })).await?;
    app.create("/api/items", Uuid::new_v4(), json!({ "name": "Not mine" })).await?;
    let cell = json!({ "avatar_id": rusk["id"], "item_id": shirt["id"], "status": "official" });
    app.post("/api/compatibility", user, cell).await?;

    let (status, body) = app.get("/api/matrix", user).await?;
    assert_eq!(status, StatusCode::OK);
    let matrix = &body["data"];
    assert_eq!(matrix["avatars"].as_array().map(Vec::len), Some(2));
    assert_eq!(matrix["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(matrix["total_avatars"], 2);
    assert_eq!(matrix["compatibilities"][0]["status"], "official");

    // Deleting an axis row drops its cells
    app.delete(&format!("/api/items/{}", id_of(&shirt)?), user).await?;
    let (_, body) = app.get("/api/matrix", user).await?;
    assert_eq!(body["data"]["compatibilities"], json!([]));
    assert_eq!(app.db.row_count("compatibility").await, 0);
    Ok(())
}
