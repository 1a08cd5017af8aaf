use serde_json::{Value, json};

use crate::common::{TestApp, png, routes};

fn image_message(url: &Value, blurhash: &Value) -> Value {
    json!({
        "msgtype": "m.image",
        "body": "large.png",
        "url": url,
        "info": {
            "mimetype": "image/png",
            "w": 64,
            "h": 48,
            "xyz.amorgan.blurhash": blurhash,
        },
    })
}

mod image_events {
    use super::*;

    #[tokio::test]
    async fn blurhash_in_message_info_reaches_other_members_verbatim() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let room_id = app
            .create_room(&alice.token, &json!({"invite": [bob.user_id]}))
            .await;
        let res = app
            .post_with_token(&routes::join(&room_id), &json!({}), &bob.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text());

        let upload = app.upload_image(png(64, 48), true, &alice.token).await;
        let content = image_message(&upload["content_uri"], &upload["xyz.amorgan.blurhash"]);

        let res = app
            .put_with_token(
                &routes::send(&room_id, "m.room.message", "txn1"),
                &content,
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text());
        let event_id = res.body["event_id"].as_str().unwrap().to_string();

        let res = app
            .get_with_token(&routes::messages(&room_id, "dir=b&limit=1"), &bob.token)
            .await;
        assert_eq!(res.status, 200);
        let latest = &res.body["chunk"][0];
        assert_eq!(latest["event_id"], event_id);
        assert_eq!(latest["type"], "m.room.message");
        assert_eq!(latest["sender"], alice.user_id);
        assert_eq!(latest["content"], content);

        let res = app
            .get_with_token(&routes::event(&room_id, &event_id), &bob.token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(
            res.body["content"]["info"]["xyz.amorgan.blurhash"],
            upload["xyz.amorgan.blurhash"]
        );
    }

    #[tokio::test]
    async fn arbitrary_blurhash_string_is_not_rewritten() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let room_id = app.create_room(&alice.token, &json!({})).await;
        let content = image_message(&json!("mxc://elsewhere/abc"), &json!("~~opaque~~"));

        let res = app
            .put_with_token(
                &routes::send(&room_id, "m.room.message", "txn1"),
                &content,
                &alice.token,
            )
            .await;
        let event_id = res.body["event_id"].as_str().unwrap();

        let res = app
            .get_with_token(&routes::event(&room_id, event_id), &alice.token)
            .await;
        assert_eq!(res.body["content"], content);
    }

    #[tokio::test]
    async fn retrying_a_transaction_returns_the_same_event() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let room_id = app.create_room(&alice.token, &json!({})).await;
        let path = routes::send(&room_id, "m.room.message", "retry-me");
        let content = json!({"msgtype": "m.text", "body": "hello"});

        let first = app.put_with_token(&path, &content, &alice.token).await;
        let second = app.put_with_token(&path, &content, &alice.token).await;

        assert_eq!(first.status, 200);
        assert_eq!(second.status, 200);
        assert_eq!(first.body["event_id"], second.body["event_id"]);

        let res = app
            .get_with_token(&routes::messages(&room_id, "dir=b&limit=100"), &alice.token)
            .await;
        let messages = res.body["chunk"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|e| e["type"] == "m.room.message")
            .count();
        assert_eq!(messages, 1);
    }

    #[tokio::test]
    async fn content_must_be_an_object() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let room_id = app.create_room(&alice.token, &json!({})).await;

        let res = app
            .put_with_token(
                &routes::send(&room_id, "m.room.message", "txn1"),
                &json!(["not", "an", "object"]),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["errcode"], "M_BAD_JSON");
    }
}

mod membership {
    use super::*;

    #[tokio::test]
    async fn outsiders_cannot_read_or_send() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let eve = app.create_authenticated_user("eve", "securepass").await;
        let room_id = app.create_room(&alice.token, &json!({})).await;

        let res = app
            .put_with_token(
                &routes::send(&room_id, "m.room.message", "txn1"),
                &json!({"msgtype": "m.text", "body": "hi"}),
                &eve.token,
            )
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["errcode"], "M_FORBIDDEN");

        let res = app
            .get_with_token(&routes::messages(&room_id, "dir=b"), &eve.token)
            .await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn private_room_requires_an_invite() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let eve = app.create_authenticated_user("eve", "securepass").await;
        let room_id = app.create_room(&alice.token, &json!({})).await;

        let res = app
            .post_with_token(&routes::join(&room_id), &json!({}), &eve.token)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["errcode"], "M_FORBIDDEN");
    }

    #[tokio::test]
    async fn anyone_can_join_a_public_room() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let room_id = app
            .create_room(&alice.token, &json!({"preset": "public_chat", "name": "Lobby"}))
            .await;

        let res = app
            .post_with_token(&routes::join_by_id(&room_id), &json!({}), &bob.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text());
        assert_eq!(res.body["room_id"], room_id);

        let again = app
            .post_with_token(&routes::join(&room_id), &json!({}), &bob.token)
            .await;
        assert_eq!(again.status, 200);
    }

    #[tokio::test]
    async fn inviting_an_unknown_user_fails() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .post_with_token(
                routes::CREATE_ROOM,
                &json!({"invite": ["@ghost:hs1"]}),
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 404);

        let res = app
            .post_with_token(
                routes::CREATE_ROOM,
                &json!({"invite": ["@bob:elsewhere"]}),
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["errcode"], "M_INVALID_PARAM");
    }

    #[tokio::test]
    async fn unknown_room_is_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .post_with_token(&routes::join("!nope:hs1"), &json!({}), &alice.token)
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["errcode"], "M_NOT_FOUND");

        let res = app
            .get_with_token(&routes::messages("!nope:hs1", "dir=b"), &alice.token)
            .await;
        assert_eq!(res.status, 404);
    }
}

mod timeline {
    use super::*;

    #[tokio::test]
    async fn backward_pagination_walks_the_whole_timeline() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let room_id = app.create_room(&alice.token, &json!({})).await;
        for i in 0..3 {
            let res = app
                .put_with_token(
                    &routes::send(&room_id, "m.room.message", &format!("txn{i}")),
                    &json!({"msgtype": "m.text", "body": format!("message {i}")}),
                    &alice.token,
                )
                .await;
            assert_eq!(res.status, 200);
        }

        let first = app
            .get_with_token(&routes::messages(&room_id, "dir=b&limit=2"), &alice.token)
            .await;
        assert_eq!(first.status, 200);
        let chunk = first.body["chunk"].as_array().unwrap();
        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk[0]["content"]["body"], "message 2");
        assert_eq!(chunk[1]["content"]["body"], "message 1");
        let end = first.body["end"].as_str().unwrap();

        let second = app
            .get_with_token(
                &routes::messages(&room_id, &format!("dir=b&limit=2&from={end}")),
                &alice.token,
            )
            .await;
        let chunk = second.body["chunk"].as_array().unwrap();
        assert_eq!(second.body["start"], end);
        assert_eq!(chunk[0]["content"]["body"], "message 0");
        assert_eq!(chunk[1]["type"], "m.room.member");
        let end = second.body["end"].as_str().unwrap();

        // Only the create event remains.
        let last = app
            .get_with_token(
                &routes::messages(&room_id, &format!("dir=b&limit=2&from={end}")),
                &alice.token,
            )
            .await;
        let chunk = last.body["chunk"].as_array().unwrap();
        assert_eq!(chunk.len(), 1);
        assert_eq!(chunk[0]["type"], "m.room.create");
        assert!(last.body.get("end").is_none());
    }

    #[tokio::test]
    async fn forward_pagination_starts_at_room_creation() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let room_id = app
            .create_room(&alice.token, &json!({"name": "Holiday photos"}))
            .await;

        let res = app
            .get_with_token(&routes::messages(&room_id, "dir=f"), &alice.token)
            .await;

        let types: Vec<&str> = res.body["chunk"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["type"].as_str().unwrap())
            .collect();
        assert_eq!(types, ["m.room.create", "m.room.member", "m.room.name"]);
    }

    #[tokio::test]
    async fn bad_pagination_token_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let room_id = app.create_room(&alice.token, &json!({})).await;

        let res = app
            .get_with_token(
                &routes::messages(&room_id, "dir=b&from=yesterday"),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["errcode"], "M_INVALID_PARAM");
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let room_id = app.create_room(&alice.token, &json!({})).await;

        let res = app
            .get_with_token(&routes::event(&room_id, "$missing"), &alice.token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["errcode"], "M_NOT_FOUND");
    }
}
