//! E2E tests for profiles, admin, statistics and notifications

mod common;

use axum::{Router, routing::get};
use common::TestServer;
use reqwest::StatusCode;
use serde_json::json;
use tokio::net::TcpListener;

/// Serve `bytes` at `/photo.jpg` on a random port and return its URL
async fn serve_image(bytes: Vec<u8>) -> String {
    let app = Router::new().route(
        "/photo.jpg",
        get(move || {
            let bytes = bytes.clone();
            async move { bytes }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/photo.jpg", addr)
}

fn jpeg(width: u16, height: u16) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8];
    bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x0B, 0x08]);
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&[0x01, 0x01, 0x11, 0x00, 0xFF, 0xD9]);
    bytes
}

#[tokio::test]
async fn test_profile_updates() {
    let server = TestServer::new().await;
    let alice = server.register("Alice", "Smith").await;
    let bob = server.register("Bob", "Jones").await;

    let (status, _) = server
        .put(
            "/user/profile/setname/v2",
            &alice.token,
            json!({ "name_first": "Alicia", "name_last": "Smythe" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .put(
            "/user/profile/setemail/v2",
            &alice.token,
            json!({ "email": "bob@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .put(
            "/user/profile/setemail/v2",
            &alice.token,
            json!({ "email": "alicia@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .put(
            "/user/profile/sethandle/v1",
            &alice.token,
            json!({ "handle_str": "bobjones" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .put(
            "/user/profile/sethandle/v1",
            &alice.token,
            json!({ "handle_str": "alicia" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .get("/user/profile/v2", &bob.token, json!({ "u_id": alice.id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name_first"], "Alicia");
    assert_eq!(body["user"]["name_last"], "Smythe");
    assert_eq!(body["user"]["email"], "alicia@example.com");
    assert_eq!(body["user"]["handle_str"], "alicia");

    let (_, body) = server.get("/users/all/v1", &bob.token, json!({})).await;
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_upload_photo() {
    let server = TestServer::new().await;
    let alice = server.register("Alice", "Smith").await;
    let url = serve_image(jpeg(64, 48)).await;

    let (status, _) = server
        .post(
            "/user/profile/uploadphoto/v1",
            &alice.token,
            json!({ "img_url": url, "x_start": 0, "y_start": 0, "x_end": 100, "y_end": 48 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "crop exceeds the image");

    let (status, _) = server
        .post(
            "/user/profile/uploadphoto/v1",
            &alice.token,
            json!({ "img_url": url, "x_start": 0, "y_start": 0, "x_end": 32, "y_end": 32 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = server
        .get("/user/profile/v2", &alice.token, json!({ "u_id": alice.id }))
        .await;
    let photo_url = format!("http://localhost:8080/static/{}_profile.jpg", alice.id);
    assert_eq!(body["user"]["profile_img_url"], photo_url);

    let response = server
        .client
        .get(&server.url(&format!("/static/{}_profile.jpg", alice.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.bytes().await.unwrap().to_vec(), jpeg(64, 48));
}

#[tokio::test]
async fn test_upload_photo_rejects_non_jpeg() {
    let server = TestServer::new().await;
    let alice = server.register("Alice", "Smith").await;
    let url = serve_image(b"\x89PNG\r\n\x1a\n".to_vec()).await;

    let (status, _) = server
        .post(
            "/user/profile/uploadphoto/v1",
            &alice.token,
            json!({ "img_url": url, "x_start": 0, "y_start": 0, "x_end": 1, "y_end": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_photo_rejects_oversized_image() {
    let server = TestServer::new().await;
    let alice = server.register("Alice", "Smith").await;
    let mut bytes = jpeg(64, 48);
    bytes.resize(2 * 1024 * 1024, 0);
    let url = serve_image(bytes).await;

    let (status, _) = server
        .post(
            "/user/profile/uploadphoto/v1",
            &alice.token,
            json!({ "img_url": url, "x_start": 0, "y_start": 0, "x_end": 1, "y_end": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = server
        .get("/user/profile/v2", &alice.token, json!({ "u_id": alice.id }))
        .await;
    assert_ne!(
        body["user"]["profile_img_url"],
        format!("http://localhost:8080/static/{}_profile.jpg", alice.id)
    );
}

#[tokio::test]
async fn test_admin_remove_user() {
    let server = TestServer::new().await;
    let alice = server.register("Alice", "Smith").await;
    let bob = server.register("Bob", "Jones").await;
    let channel = server.create_channel(&alice, "general", true).await;
    server
        .post("/channel/join/v2", &bob.token, json!({ "channel_id": channel }))
        .await;
    server.send(&bob, channel, "soon gone").await;

    let (status, _) = server
        .delete(
            "/admin/user/remove/v1",
            &bob.token,
            json!({ "u_id": alice.id }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .delete(
            "/admin/user/remove/v1",
            &alice.token,
            json!({ "u_id": alice.id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "the only global owner stays");

    let (status, _) = server
        .delete("/admin/user/remove/v1", &alice.token, json!({ "u_id": bob.id }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.get("/channels/list/v2", &bob.token, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = server
        .get("/user/profile/v2", &alice.token, json!({ "u_id": bob.id }))
        .await;
    assert_eq!(body["user"]["name_first"], "Removed");
    assert_eq!(body["user"]["name_last"], "user");

    let (_, body) = server
        .get(
            "/channel/messages/v2",
            &alice.token,
            json!({ "channel_id": channel, "start": 0 }),
        )
        .await;
    assert_eq!(body["messages"][0]["message"], "Removed user");

    let (_, body) = server.get("/users/all/v1", &alice.token, json!({})).await;
    assert_eq!(body["users"].as_array().unwrap().len(), 1);

    // The removed user's email is free again.
    server.register("Bob", "Again").await;
}

#[tokio::test]
async fn test_change_permission() {
    let server = TestServer::new().await;
    let alice = server.register("Alice", "Smith").await;
    let bob = server.register("Bob", "Jones").await;

    let (status, _) = server
        .post(
            "/admin/userpermission/change/v1",
            &alice.token,
            json!({ "u_id": bob.id, "permission_id": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post(
            "/admin/userpermission/change/v1",
            &bob.token,
            json!({ "u_id": bob.id, "permission_id": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .post(
            "/admin/userpermission/change/v1",
            &alice.token,
            json!({ "u_id": bob.id, "permission_id": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Bob can now join private channels.
    let private = server.create_channel(&alice, "secret", false).await;
    let (status, _) = server
        .post("/channel/join/v2", &bob.token, json!({ "channel_id": private }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_stats_wire_format() {
    let server = TestServer::new().await;
    let alice = server.register("Alice", "Smith").await;
    let bob = server.register("Bob", "Jones").await;
    let channel = server.create_channel(&alice, "general", true).await;
    server.send(&alice, channel, "hello").await;

    let (status, body) = server.get("/user/stats/v1", &alice.token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["user_stats"];
    let latest = stats["channels_joined"].as_array().unwrap().last().unwrap();
    assert_eq!(latest["num_channels_joined"], 1);
    assert!(latest["time_stamp"].is_i64());
    let latest = stats["messages_sent"].as_array().unwrap().last().unwrap();
    assert_eq!(latest["num_messages_sent"], 1);
    assert!(stats["dms_joined"].is_array());
    assert_eq!(stats["involvement_rate"], 1.0);

    let (status, body) = server.get("/users/stats/v1", &bob.token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["dreams_stats"];
    let latest = stats["channels_exist"].as_array().unwrap().last().unwrap();
    assert_eq!(latest["num_channels_exist"], 1);
    let latest = stats["messages_exist"].as_array().unwrap().last().unwrap();
    assert_eq!(latest["num_messages_exist"], 1);
    assert!(stats["dms_exist"].is_array());
    assert_eq!(stats["utilization_rate"], 0.5);
}

#[tokio::test]
async fn test_notifications() {
    let server = TestServer::new().await;
    let alice = server.register("Alice", "Smith").await;
    let bob = server.register("Bob", "Jones").await;
    let channel = server.create_channel(&alice, "general", false).await;

    server
        .post(
            "/channel/invite/v2",
            &alice.token,
            json!({ "channel_id": channel, "u_id": bob.id }),
        )
        .await;
    server.send(&alice, channel, "@bobjones welcome").await;

    let (status, body) = server
        .get("/notifications/get/v1", &bob.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let notifications = body["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 2);
    assert_eq!(
        notifications[0]["notification_message"],
        "alicesmith tagged you in general: @bobjones welcome"
    );
    assert_eq!(notifications[0]["channel_id"], channel);
    assert_eq!(notifications[0]["dm_id"], -1);
    assert_eq!(
        notifications[1]["notification_message"],
        "alicesmith added you to general"
    );

    let (_, body) = server
        .get("/notifications/get/v1", &alice.token, json!({}))
        .await;
    assert!(body["notifications"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_clear_resets_everything() {
    let server = TestServer::new().await;
    let alice = server.register("Alice", "Smith").await;
    server.create_channel(&alice, "general", true).await;

    let (status, _) = server
        .call(reqwest::Method::DELETE, "/clear/v1", None, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.get("/channels/list/v2", &alice.token, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let again = server.register("Alice", "Smith").await;
    assert_eq!(again.id, 1);
}

#[tokio::test]
async fn test_clear_is_not_mounted_by_default() {
    let server = TestServer::without_clear().await;
    let alice = server.register("Alice", "Smith").await;

    let (status, _) = server
        .call(reqwest::Method::DELETE, "/clear/v1", None, json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.get("/channels/list/v2", &alice.token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_snapshot_survives_restart() {
    let server = TestServer::with_persistence(true).await;
    let alice = server.register("Alice", "Smith").await;
    let channel = server.create_channel(&alice, "general", true).await;
    server.send(&alice, channel, "persisted").await;

    server.state.save_snapshot().await.unwrap();

    let restored = dreams::AppState::new(server.state.config.as_ref().clone())
        .await
        .unwrap();
    let graph = restored.store.read();
    assert_eq!(graph.live_channel_count(), 1);
    assert_eq!(graph.live_message_count(), 1);
}
