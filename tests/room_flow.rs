//! Integration tests for room admission, content and deletion over the
//! WebSocket surface.

mod common;

use common::TestServer;
use serde_json::{Value, json};

fn member_ids(members: &Value) -> Vec<String> {
    members
        .as_array()
        .expect("members array")
        .iter()
        .map(|m| m["userId"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_request_accept_flow() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");

    let mut owner = server.connect().await.expect("Failed to connect owner");
    owner
        .send("create-room", json!({ "userId": "u1", "userName": "Ana" }))
        .await
        .unwrap();
    let created = owner.recv_event("room-created").await.unwrap();
    let room_id = created["roomId"].as_str().unwrap().to_string();
    let friendly = created["friendlyName"].as_str().unwrap().to_string();
    owner.recv_event("room-joined").await.unwrap();

    let found: Value = reqwest::get(server.http_url(&format!("/find-room/{friendly}")))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found["exists"], true);
    assert_eq!(found["roomId"], room_id.as_str());

    let mut guest = server.connect().await.expect("Failed to connect guest");
    guest
        .send("join-request", json!({ "roomId": room_id, "user": "u2", "userName": "Bo" }))
        .await
        .unwrap();
    guest.recv_event("join-pending").await.unwrap();
    let request = owner.recv_event("join-request").await.unwrap();
    assert_eq!(request["user"], "u2");
    assert_eq!(request["userName"], "Bo");

    owner
        .send("accept-join", json!({ "roomId": room_id, "user": "u2" }))
        .await
        .unwrap();

    let approved = guest.recv_event("join-approved").await.unwrap();
    let members = member_ids(&approved["members"]);
    assert!(members.contains(&"u1".to_string()));
    assert!(members.contains(&"u2".to_string()));

    assert_eq!(guest.recv_event("member-joined").await.unwrap()["user"], "u2");
    assert_eq!(owner.recv_event("member-joined").await.unwrap()["user"], "u2");
    let resolved = owner.recv_event("join-request-resolved").await.unwrap();
    assert_eq!(resolved["accepted"], true);
}

#[tokio::test]
async fn test_chat_is_broadcast_and_exported() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");

    let mut owner = server.connect().await.unwrap();
    owner.join("chat-room", "u1", true).await.unwrap();
    owner
        .send("invite", json!({ "roomId": "chat-room", "invitee": "u2" }))
        .await
        .unwrap();
    owner.recv_event("invite-sent").await.unwrap();

    let mut member = server.connect().await.unwrap();
    member.join("chat-room", "u2", false).await.unwrap();
    owner.recv_event("user-joined").await.unwrap();

    member
        .send("chat-message", json!({ "roomId": "chat-room", "text": "hello" }))
        .await
        .unwrap();

    let own = member.recv_event("chat-message").await.unwrap();
    let seen = owner.recv_event("chat-message").await.unwrap();
    assert_eq!(own["text"], "hello");
    assert_eq!(own["id"], seen["id"]);
    assert!(!own["id"].as_str().unwrap().is_empty());
    assert!(chrono::DateTime::parse_from_rfc3339(own["timestamp"].as_str().unwrap()).is_ok());

    owner
        .send("export-data", json!({ "roomId": "chat-room", "type": "chat" }))
        .await
        .unwrap();
    let export = owner.recv_event("export-ready").await.unwrap();
    assert_eq!(export["type"], "chat");
    assert_eq!(export["data"][0]["text"], "hello");
    assert_eq!(export["data"][0]["fromUserId"], "u2");
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut client = server.connect().await.unwrap();

    client.send_raw("this is not json").await.unwrap();
    let error = client.recv_event("room-error").await.unwrap();
    assert_eq!(error["type"], "ValidationFailed");

    client
        .send("launch-rockets", json!({}))
        .await
        .unwrap();
    assert_eq!(client.recv_event("room-error").await.unwrap()["type"], "ValidationFailed");

    let joined = client.join("still-here", "u1", true).await.unwrap();
    assert_eq!(joined["isOwner"], true);
}

#[tokio::test]
async fn test_missing_room_and_non_owner_delete() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");

    let mut stranger = server.connect().await.unwrap();
    stranger
        .send("join-room", json!({ "roomId": "nowhere", "userId": "u9" }))
        .await
        .unwrap();
    assert_eq!(stranger.recv_event("room-not-found").await.unwrap()["roomId"], "nowhere");

    let mut owner = server.connect().await.unwrap();
    owner.join("doomed", "u1", true).await.unwrap();
    owner
        .send("invite", json!({ "roomId": "doomed", "invitee": "u2" }))
        .await
        .unwrap();
    let mut member = server.connect().await.unwrap();
    member.join("doomed", "u2", false).await.unwrap();

    member
        .send("delete-room", json!({ "roomId": "doomed", "user": "u1" }))
        .await
        .unwrap();
    assert_eq!(member.recv_event("room-error").await.unwrap()["type"], "NotOwner");

    let detail: Value = reqwest::get(server.http_url("/api/rooms/doomed"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["exists"], true);
    assert_eq!(detail["participants"].as_array().unwrap().len(), 2);

    owner
        .send("delete-room", json!({ "roomId": "doomed" }))
        .await
        .unwrap();
    assert_eq!(member.recv_event("room-deleted").await.unwrap()["roomId"], "doomed");
    owner.recv_event("room-deleted").await.unwrap();

    let response = reqwest::get(server.http_url("/api/rooms/doomed")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let detail: Value = response.json().await.unwrap();
    assert_eq!(detail["exists"], false);
    assert_eq!(detail["recentlyDeleted"], true);
}

#[tokio::test]
async fn test_signaling_reaches_only_target() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");

    let mut owner = server.connect().await.unwrap();
    owner.join("call", "u1", true).await.unwrap();
    owner
        .send("invite", json!({ "roomId": "call", "invitee": "u2" }))
        .await
        .unwrap();
    let mut member = server.connect().await.unwrap();
    member.join("call", "u2", false).await.unwrap();

    owner
        .send("offer", json!({ "roomId": "call", "to": "u2", "offer": { "type": "offer", "sdp": "v=0" } }))
        .await
        .unwrap();
    let offer = member.recv_event("offer").await.unwrap();
    assert_eq!(offer["from"], "u1");
    assert_eq!(offer["payload"]["sdp"], "v=0");

    owner
        .send("ice-candidate", json!({ "roomId": "call", "to": "ghost", "candidate": {} }))
        .await
        .unwrap();
    assert_eq!(owner.recv_event("room-error").await.unwrap()["type"], "InvalidTarget");
}
