mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestUser;

async fn create_item(server: &common::TestServer, client: &reqwest::Client, user: &TestUser, name: &str) -> Result<Value> {
    let res = client
        .post(server.url(&format!("/api/u/{}/items", user.username)))
        .bearer_auth(&user.token)
        .json(&json!({ "name": name, "quantity": 3, "price": 1250, "description": "test item" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = res.json::<Value>().await?;
    Ok(body["data"].clone())
}

#[tokio::test]
async fn create_get_update_delete() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let alice = common::register_and_login(server, &client, "items").await?;

    let item = create_item(server, &client, &alice, "Lamp").await?;
    assert_eq!(item["owner"], alice.username.as_str());
    let id = item["item_id"].as_str().unwrap_or_default().to_string();
    let item_url = server.url(&format!("/api/u/{}/items/{}", alice.username, id));

    // reads are public
    let fetched = client.get(&item_url).send().await?;
    assert_eq!(fetched.status(), StatusCode::OK);

    let patched = client
        .patch(&item_url)
        .bearer_auth(&alice.token)
        .json(&json!({ "price": 990 }))
        .send()
        .await?;
    assert_eq!(patched.status(), StatusCode::OK);
    let patched = patched.json::<Value>().await?;
    assert_eq!(patched["data"]["price"], 990);
    assert_eq!(patched["data"]["name"], "Lamp");
    assert_eq!(patched["data"]["quantity"], 3);
    assert_eq!(patched["data"]["description"], "test item");

    let deleted = client.delete(&item_url).bearer_auth(&alice.token).send().await?;
    assert_eq!(deleted.status(), StatusCode::OK);

    let gone = client.get(&item_url).send().await?;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    let again = client.delete(&item_url).bearer_auth(&alice.token).send().await?;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn other_users_cannot_mutate() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let alice = common::register_and_login(server, &client, "owner").await?;
    let mallory = common::register_and_login(server, &client, "intruder").await?;

    let item = create_item(server, &client, &alice, "Desk").await?;
    let id = item["item_id"].as_str().unwrap_or_default().to_string();
    let item_url = server.url(&format!("/api/u/{}/items/{}", alice.username, id));

    let patch = client
        .patch(&item_url)
        .bearer_auth(&mallory.token)
        .json(&json!({ "name": "Stolen" }))
        .send()
        .await?;
    assert_eq!(patch.status(), StatusCode::FORBIDDEN);

    let delete = client.delete(&item_url).bearer_auth(&mallory.token).send().await?;
    assert_eq!(delete.status(), StatusCode::FORBIDDEN);

    let create = client
        .post(server.url(&format!("/api/u/{}/items", alice.username)))
        .bearer_auth(&mallory.token)
        .json(&json!({ "name": "Planted", "quantity": 1, "price": 1 }))
        .send()
        .await?;
    assert_eq!(create.status(), StatusCode::FORBIDDEN);

    // addressing the item through the intruder's own namespace finds nothing
    let own_path = server.url(&format!("/api/u/{}/items/{}", mallory.username, id));
    let sideways = client.delete(&own_path).bearer_auth(&mallory.token).send().await?;
    assert_eq!(sideways.status(), StatusCode::NOT_FOUND);

    let stored = client.get(&item_url).send().await?.json::<Value>().await?;
    assert_eq!(stored["data"]["name"], "Desk");
    Ok(())
}

#[tokio::test]
async fn pagination_metadata() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let user = common::register_and_login(server, &client, "pager").await?;

    for i in 0..25 {
        create_item(server, &client, &user, &format!("Item {}", i)).await?;
    }

    let body = client
        .get(server.url(&format!("/api/u/{}/items?limit=10&offset=20", user.username)))
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(body["data"]["page_size"], 5);
    assert_eq!(body["data"]["total"], 25);
    assert_eq!(body["data"]["total_pages"], 3);
    assert_eq!(body["data"]["current"], 3);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(5));

    // junk falls back to defaults
    let body = client
        .get(server.url(&format!("/api/u/{}/items?limit=abc&offset=-4", user.username)))
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(body["data"]["page_size"], 10);
    assert_eq!(body["data"]["current"], 1);
    assert_eq!(body["data"]["items"][0]["name"], "Item 24");

    // repeated keys keep the first value instead of rejecting the request
    let res = client
        .get(server.url(&format!("/api/u/{}/items?limit=3&limit=50", user.username)))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["page_size"], 3);
    assert_eq!(body["data"]["total_pages"], 9);

    let wrong_method = client
        .put(server.url(&format!("/api/u/{}/items", user.username)))
        .send()
        .await?;
    assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = wrong_method.json::<Value>().await?;
    assert_eq!(body["error"]["code"], "METHOD_NOT_ALLOWED");
    Ok(())
}

#[tokio::test]
async fn malformed_input_is_a_client_error() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let user = common::register_and_login(server, &client, "inputs").await?;

    let bad_id = client
        .get(server.url(&format!("/api/u/{}/items/42", user.username)))
        .send()
        .await?;
    assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);

    let zero_quantity = client
        .post(server.url(&format!("/api/u/{}/items", user.username)))
        .bearer_auth(&user.token)
        .json(&json!({ "name": "Nothing", "quantity": 0, "price": 100 }))
        .send()
        .await?;
    assert_eq!(zero_quantity.status(), StatusCode::BAD_REQUEST);
    let body = zero_quantity.json::<Value>().await?;
    assert!(body["error"]["fields"].get("quantity").is_some(), "{}", body);
    Ok(())
}
