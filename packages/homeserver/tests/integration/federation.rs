use serde_json::json;

use crate::common::{TestApp, TestUser, fake_peer, routes};

const HASH: &str = "LEHV6nWB2yk8pyo0adR*.7kCMdnj";

async fn set_avatar(app: &TestApp, user: &TestUser, avatar_url: &str, blurhash: &str) {
    let res = app
        .put_with_token(
            &routes::profile_field(&user.user_id, "avatar_url"),
            &json!({"avatar_url": avatar_url, "xyz.amorgan.blurhash": blurhash}),
            &user.token,
        )
        .await;
    assert_eq!(res.status, 200, "set avatar failed: {}", res.text());
}

mod server_keys {
    use super::*;

    #[tokio::test]
    async fn publishes_the_configured_key() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::SERVER_KEYS).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["server_name"], "hs1");
        let key = res.body["verify_keys"]["ed25519:auto"]["key"].as_str().unwrap();
        assert_eq!(key.len(), 64);
        assert!(res.body["valid_until_ts"].as_i64().unwrap() > 0);
    }
}

mod inbound_query {
    use super::*;

    async fn app_with_pinned_peer() -> (TestApp, homeserver::federation::ServerKey) {
        let (key, peer) = fake_peer("rogue");
        let app = TestApp::spawn_with(|config| config.federation.peers.push(peer)).await;
        (app, key)
    }

    #[tokio::test]
    async fn signed_query_returns_avatar_and_blurhash() {
        let (app, key) = app_with_pinned_peer().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        set_avatar(&app, &alice, "mxc://hs1/avatar", HASH).await;

        let res = app
            .signed_get(&key, "rogue", "hs1", &routes::federation_profile(&alice.user_id))
            .await;

        assert_eq!(res.status, 200, "{}", res.text());
        assert_eq!(
            res.body,
            json!({"avatar_url": "mxc://hs1/avatar", "xyz.amorgan.blurhash": HASH})
        );
    }

    #[tokio::test]
    async fn field_filter_keeps_blurhash_with_avatar() {
        let (app, key) = app_with_pinned_peer().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        set_avatar(&app, &alice, "mxc://hs1/avatar", HASH).await;
        app.put_with_token(
            &routes::profile_field(&alice.user_id, "displayname"),
            &json!({"displayname": "Alice"}),
            &alice.token,
        )
        .await;

        let path = format!("{}&field=avatar_url", routes::federation_profile(&alice.user_id));
        let res = app.signed_get(&key, "rogue", "hs1", &path).await;
        assert_eq!(res.status, 200);
        assert_eq!(
            res.body,
            json!({"avatar_url": "mxc://hs1/avatar", "xyz.amorgan.blurhash": HASH})
        );

        let path = format!("{}&field=displayname", routes::federation_profile(&alice.user_id));
        let res = app.signed_get(&key, "rogue", "hs1", &path).await;
        assert_eq!(res.body, json!({"displayname": "Alice"}));
    }

    #[tokio::test]
    async fn unsigned_request_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .get_without_token(&routes::federation_profile(&alice.user_id))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["errcode"], "M_UNAUTHORIZED");
    }

    #[tokio::test]
    async fn signature_from_an_unpinned_key_is_rejected() {
        let (app, _pinned) = app_with_pinned_peer().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let (impostor, _) = fake_peer("rogue");

        let res = app
            .signed_get(
                &impostor,
                "rogue",
                "hs1",
                &routes::federation_profile(&alice.user_id),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["errcode"], "M_UNAUTHORIZED");
    }

    #[tokio::test]
    async fn pinned_peer_cannot_introduce_a_new_key_id() {
        let (app, _pinned) = app_with_pinned_peer().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let rotated = homeserver::federation::ServerKey::from_config(
            &homeserver::config::FederationConfig {
                key_id: "ed25519:new".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        let res = app
            .signed_get(
                &rotated,
                "rogue",
                "hs1",
                &routes::federation_profile(&alice.user_id),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["errcode"], "M_UNAUTHORIZED");
    }

    #[tokio::test]
    async fn request_for_another_destination_is_rejected() {
        let (app, key) = app_with_pinned_peer().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .signed_get(&key, "rogue", "hs2", &routes::federation_profile(&alice.user_id))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["errcode"], "M_UNAUTHORIZED");
    }

    #[tokio::test]
    async fn signature_does_not_cover_a_different_uri() {
        let (app, key) = app_with_pinned_peer().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        app.create_authenticated_user("bob", "securepass").await;

        let authorization = key.authorize(&homeserver::federation::signing::RequestToSign {
            destination: "hs1",
            method: "GET",
            origin: "rogue",
            uri: &routes::federation_profile(&alice.user_id),
        });
        let res = app
            .get_with_header(
                &routes::federation_profile("@bob:hs1"),
                "Authorization",
                &authorization,
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["errcode"], "M_UNAUTHORIZED");
    }

    #[tokio::test]
    async fn only_local_users_are_served() {
        let (app, key) = app_with_pinned_peer().await;

        for user_id in ["@nobody:hs1", "@alice:rogue", "not-a-user-id"] {
            let res = app
                .signed_get(&key, "rogue", "hs1", &routes::federation_profile(user_id))
                .await;
            assert_eq!(res.status, 404, "{user_id} should not be found");
            assert_eq!(res.body["errcode"], "M_NOT_FOUND");
        }
    }
}

mod remote_profiles {
    use super::*;

    #[tokio::test]
    async fn remote_avatar_blurhash_matches_what_the_owner_set() {
        let (hs1, hs2) = TestApp::spawn_federated_pair().await;
        let alice = hs1.create_authenticated_user("alice", "securepass").await;
        let bob = hs2.create_authenticated_user("bob", "securepass").await;
        set_avatar(&hs2, &bob, "mxc://hs2/avatar", HASH).await;

        let res = hs1
            .get_with_token(&routes::profile(&bob.user_id), &alice.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text());
        assert_eq!(
            res.body,
            json!({"avatar_url": "mxc://hs2/avatar", "xyz.amorgan.blurhash": HASH})
        );

        let res = hs1
            .get_with_token(
                &routes::profile_field(&bob.user_id, "avatar_url"),
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["xyz.amorgan.blurhash"], HASH);
    }

    #[tokio::test]
    async fn later_updates_are_visible_remotely() {
        let (hs1, hs2) = TestApp::spawn_federated_pair().await;
        let alice = hs1.create_authenticated_user("alice", "securepass").await;
        let bob = hs2.create_authenticated_user("bob", "securepass").await;
        set_avatar(&hs2, &bob, "mxc://hs2/first", HASH).await;
        set_avatar(&hs2, &bob, "mxc://hs2/second", "L00000fQfQfQfQfQfQfQfQfQfQfQ").await;

        let res = hs1
            .get_with_token(&routes::profile(&bob.user_id), &alice.token)
            .await;

        assert_eq!(res.body["avatar_url"], "mxc://hs2/second");
        assert_eq!(res.body["xyz.amorgan.blurhash"], "L00000fQfQfQfQfQfQfQfQfQfQfQ");
    }

    #[tokio::test]
    async fn unknown_remote_user_is_not_found() {
        let (hs1, _hs2) = TestApp::spawn_federated_pair().await;
        let alice = hs1.create_authenticated_user("alice", "securepass").await;

        let res = hs1
            .get_with_token(&routes::profile("@ghost:hs2"), &alice.token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["errcode"], "M_NOT_FOUND");
    }

    #[tokio::test]
    async fn unconfigured_server_is_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .get_with_token(&routes::profile("@carol:hs3"), &alice.token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["errcode"], "M_NOT_FOUND");
    }
}
