use crate::common::{MAX_UPLOAD_SIZE, TestApp, expected_blurhash, png, routes};

mod upload_blurhash {
    use super::*;

    #[tokio::test]
    async fn requested_blurhash_matches_client_side_computation() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let image = png(64, 48);

        let body = app.upload_image(image.clone(), true, &alice.token).await;

        assert!(
            body["content_uri"]
                .as_str()
                .unwrap()
                .starts_with("mxc://hs1/")
        );
        let hash = body["xyz.amorgan.blurhash"].as_str().unwrap();
        assert_eq!(hash, expected_blurhash(&image, hash));
    }

    #[tokio::test]
    async fn returned_hash_uses_four_by_three_components() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let body = app.upload_image(png(32, 32), true, &alice.token).await;

        let hash = body["xyz.amorgan.blurhash"].as_str().unwrap();
        let components = ::common::blurhash::decode_components(hash).unwrap();
        assert_eq!((components.x, components.y), (4, 3));
    }

    #[tokio::test]
    async fn no_blurhash_unless_requested() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let body = app.upload_image(png(16, 16), false, &alice.token).await;
        assert!(body["content_uri"].is_string());
        assert!(body.get("xyz.amorgan.blurhash").is_none());

        let res = app
            .upload_with_token(routes::UPLOAD, png(16, 16), "image/png", &alice.token)
            .await;
        assert_eq!(res.status, 200);
        assert!(res.body.get("xyz.amorgan.blurhash").is_none());
    }

    #[tokio::test]
    async fn non_image_upload_succeeds_without_blurhash() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .upload_with_token(
                &routes::upload("filename=notes.txt&xyz.amorgan.generate_blurhash=true"),
                b"just some text".to_vec(),
                "text/plain",
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text());
        assert!(res.body["content_uri"].is_string());
        assert!(res.body.get("xyz.amorgan.blurhash").is_none());
    }

    #[tokio::test]
    async fn corrupt_image_upload_succeeds_without_blurhash() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let mut image = png(16, 16);
        image.truncate(image.len() / 2);

        let body = app.upload_image(image, true, &alice.token).await;

        assert!(body["content_uri"].is_string());
        assert!(body.get("xyz.amorgan.blurhash").is_none());
    }

    #[tokio::test]
    async fn identical_bytes_get_distinct_ids_and_the_same_hash() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let image = png(20, 10);

        let first = app.upload_image(image.clone(), true, &alice.token).await;
        let second = app.upload_image(image, true, &alice.token).await;

        assert_ne!(first["content_uri"], second["content_uri"]);
        assert_eq!(first["xyz.amorgan.blurhash"], second["xyz.amorgan.blurhash"]);
    }
}

mod upload_limits {
    use super::*;

    #[tokio::test]
    async fn upload_requires_a_token() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .post(app.url(routes::UPLOAD))
            .body(png(4, 4))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .upload_with_token(
                routes::UPLOAD,
                vec![0u8; MAX_UPLOAD_SIZE as usize + 1],
                "application/octet-stream",
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 413);
        assert_eq!(res.body["errcode"], "M_TOO_LARGE");
    }

    #[tokio::test]
    async fn filename_with_path_separator_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .upload_with_token(
                &routes::upload("filename=..%2Fescape.png"),
                png(4, 4),
                "image/png",
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["errcode"], "M_INVALID_PARAM");
    }

    #[tokio::test]
    async fn empty_body_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .upload_with_token(routes::UPLOAD, Vec::new(), "image/png", &alice.token)
            .await;

        assert_eq!(res.status, 400);
    }
}

mod download {
    use super::*;

    #[tokio::test]
    async fn uploaded_bytes_are_served_back() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let image = png(12, 12);

        let body = app.upload_image(image.clone(), false, &alice.token).await;
        let res = app
            .get_without_token(&routes::download(body["content_uri"].as_str().unwrap()))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.bytes, image);
        assert_eq!(res.header("content-type"), Some("image/png"));
        assert!(
            res.header("content-disposition")
                .unwrap()
                .contains("filename=\"large.png\"")
        );
    }

    #[tokio::test]
    async fn matching_etag_yields_not_modified() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let body = app.upload_image(png(12, 12), false, &alice.token).await;
        let path = routes::download(body["content_uri"].as_str().unwrap());
        let first = app.get_without_token(&path).await;
        let etag = first.header("etag").unwrap().to_string();

        let res = app.get_with_header(&path, "If-None-Match", &etag).await;

        assert_eq!(res.status, 304);
    }

    #[tokio::test]
    async fn unknown_media_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .get_without_token(&routes::download("mxc://hs1/doesnotexist"))
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["errcode"], "M_NOT_FOUND");

        let res = app
            .get_without_token(&routes::download("mxc://elsewhere/doesnotexist"))
            .await;
        assert_eq!(res.status, 404);
    }
}
