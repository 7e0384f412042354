mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{Duration, Utc};

use ::common::prelude::Expiry;

const FORWARDED: &str = "x-forwarded-for";

#[tokio::test]
async fn test_serves_file_with_policy_headers() {
    let server = common::setup();
    server.insert(common::file("hello.txt", 5), "hello");

    let reply = server.get("/hello.txt", &[]).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, b"hello");
    assert_eq!(reply.header("content-type"), Some("text/plain"));
    assert_eq!(reply.header("content-length"), Some("5"));
    assert_eq!(
        reply.header("etag"),
        Some(format!("\"{}\"", common::CONTENT_HASH).as_str())
    );
    assert_eq!(reply.header("cache-control"), Some("public, no-cache"));
    assert_eq!(reply.header("referrer-policy"), Some("same-origin"));
    assert!(reply
        .header("content-security-policy")
        .is_some_and(|csp| csp.starts_with("default-src 'none'")));
}

#[tokio::test]
async fn test_selif_path_serves_same_file() {
    let server = common::setup();
    server.insert(common::file("hello.txt", 5), "hello");

    let reply = server.get("/selif/hello.txt", &[]).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, b"hello");
}

#[tokio::test]
async fn test_unknown_file_is_not_found() {
    let server = common::setup();

    let reply = server
        .get("/nope.txt", &[("accept", "application/json")])
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(String::from_utf8_lossy(&reply.body).contains("not found"));
}

#[tokio::test]
async fn test_expired_file_is_removed_on_access() {
    let server = common::setup();
    let mut metadata = common::file("old.txt", 3);
    metadata.expiry = Expiry::At(Utc::now() - Duration::hours(1));
    server.insert(metadata, "old");

    let reply = server.get("/old.txt", &[]).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(!server.backend.contains("old.txt"));
}

#[tokio::test]
async fn test_access_key_sources() {
    let server = common::setup();
    let mut metadata = common::file("secret.txt", 6);
    metadata.access_key = Some("hunter2".to_string());
    server.insert(metadata, "secret");

    let reply = server.get("/secret.txt", &[]).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    // a missing key never clears cookies
    assert!(reply.set_cookies().is_empty());

    let reply = server
        .get("/secret.txt", &[("linx-access-key", "hunter2")])
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = server.get("/secret.txt?access_key=hunter2", &[]).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = server
        .get("/secret.txt", &[("cookie", "access_key=hunter2")])
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, b"secret");
}

#[tokio::test]
async fn test_repeated_query_key_uses_first_value() {
    let server = common::setup();
    let mut metadata = common::file("secret.txt", 6);
    metadata.access_key = Some("hunter2".to_string());
    server.insert(metadata, "secret");

    let reply = server
        .get("/secret.txt?access_key=hunter2&access_key=other", &[])
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, b"secret");

    // an empty first value does not hide the real one
    let reply = server
        .get("/secret.txt?access_key=&access_key=hunter2&x=1", &[])
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = server
        .get("/secret.txt?access_key=other&access_key=hunter2", &[])
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_header_key_wins_over_cookie() {
    let server = common::setup();
    let mut metadata = common::file("secret.txt", 6);
    metadata.access_key = Some("hunter2".to_string());
    server.insert(metadata, "secret");

    let reply = server
        .get(
            "/secret.txt",
            &[("linx-access-key", "wrong"), ("cookie", "access_key=hunter2")],
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    // the failed key came from the header, the cookie is left alone
    assert!(reply.set_cookies().is_empty());
}

#[tokio::test]
async fn test_stale_access_key_cookie_is_cleared() {
    let server = common::setup();
    let mut metadata = common::file("secret.txt", 6);
    metadata.access_key = Some("hunter2".to_string());
    server.insert(metadata, "secret");

    let reply = server
        .get("/secret.txt", &[("cookie", "access_key=stale")])
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let cleared = reply.set_cookies();
    assert_eq!(cleared.len(), 2);
    assert!(cleared
        .iter()
        .all(|c| c.starts_with("access_key=;") && c.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_unauthorized_page_offers_unlock_form() {
    let server = common::setup();
    let mut metadata = common::file("secret.txt", 6);
    metadata.access_key = Some("hunter2".to_string());
    server.insert(metadata, "secret");

    let reply = server.get("/secret.txt", &[("accept", "text/html")]).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    let page = String::from_utf8_lossy(&reply.body);
    assert!(page.contains("method=\"post\""));
    assert!(page.contains("secret.txt"));
    assert!(page.contains("name=\"access_key\""));
}

#[tokio::test]
async fn test_unlock_sets_cookie_and_redirects() {
    let server = common::setup();
    let mut metadata = common::file("secret.txt", 6);
    metadata.access_key = Some("hunter2".to_string());
    server.insert(metadata, "secret");

    let unlock = |key: &str| {
        Request::builder()
            .method("POST")
            .uri("/secret.txt")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("access_key={}", key)))
            .unwrap()
    };

    let reply = server.send(unlock("wrong")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.set_cookies().is_empty());

    let reply = server.send(unlock("hunter2")).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.header("location"), Some("/secret.txt"));
    let cookies = reply.set_cookies();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.contains("Path=/secret.txt")));
    assert!(cookies.iter().any(|c| c.contains("Path=/selif/secret.txt")));

    let cookie = reply.cookie("access_key").unwrap();
    let reply = server.get("/secret.txt", &[("cookie", &cookie)]).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn test_selif_hotlink_is_redirected() {
    let server = common::setup();
    server.insert(common::file("cat.png", 3), "cat");

    let reply = server
        .get(
            "/selif/cat.png",
            &[("host", "files.example.com"), ("referer", "https://evil.example.net/")],
        )
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.header("location"), Some("/cat.png"));
    assert!(reply.body.is_empty());

    let reply = server
        .get(
            "/selif/cat.png",
            &[
                ("host", "files.example.com"),
                ("referer", "http://files.example.com/cat.png"),
            ],
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, b"cat");
}

#[tokio::test]
async fn test_hotlink_redirect_ends_at_file_page() {
    let server = common::setup();
    let mut metadata = common::file("cat.png", 3);
    metadata.max_downloads = 5;
    server.insert(metadata, "cat");
    let hotlinked = [
        ("host", "files.example.com"),
        ("referer", "https://evil.example.net/"),
        ("accept", "application/json"),
    ];

    // follow redirects the way a browser does, keeping the Referer
    let mut uri = "/selif/cat.png".to_string();
    let mut reply = server.get(&uri, &hotlinked).await;
    for _ in 0..5 {
        if reply.status != StatusCode::SEE_OTHER {
            break;
        }
        uri = reply.header("location").expect("redirect target").to_string();
        reply = server.get(&uri, &hotlinked).await;
    }

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(uri, "/cat.png");
    assert_ne!(reply.body, b"cat");
    let body: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
    assert_eq!(body["name"], "cat.png");
    assert_eq!(body["url"], "/selif/cat.png");

    // the page is not a view
    assert_eq!(server.backend.serve_calls(), 0);
    assert_eq!(server.backend.metadata("cat.png").unwrap().max_downloads, 5);
    assert!(reply.cookie("filehash").is_none());
}

#[tokio::test]
async fn test_canonical_hotlink_renders_html_page() {
    let server = common::setup();
    server.insert(common::file("cat.png", 3), "cat");

    let reply = server
        .get(
            "/cat.png",
            &[
                ("host", "files.example.com"),
                ("referer", "https://evil.example.net/"),
                ("accept", "text/html"),
            ],
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let page = String::from_utf8_lossy(&reply.body);
    assert!(page.contains("cat.png"));
    assert!(page.contains("3 bytes"));
    assert!(page.contains("Download"));
}

#[tokio::test]
async fn test_hotlink_allowed_by_config() {
    let server = common::setup_with(service::SiteConfig {
        allow_hotlink: true,
        ..Default::default()
    });
    server.insert(common::file("cat.png", 3), "cat");

    let reply = server
        .get("/cat.png", &[("referer", "https://evil.example.net/")])
        .await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn test_if_none_match_is_not_modified_and_free() {
    let server = common::setup();
    let mut metadata = common::file("once.txt", 4);
    metadata.max_downloads = 1;
    server.insert(metadata, "once");

    let etag = format!("\"{}\"", common::CONTENT_HASH);
    let reply = server.get("/once.txt", &[("if-none-match", &etag)]).await;
    assert_eq!(reply.status, StatusCode::NOT_MODIFIED);
    assert!(reply.body.is_empty());
    assert_eq!(reply.header("content-type"), None);
    assert_eq!(reply.header("etag"), Some(etag.as_str()));

    // the revalidation did not use up the single view
    assert_eq!(server.backend.metadata("once.txt").unwrap().max_downloads, 1);
    assert_eq!(server.backend.serve_calls(), 0);
}

#[tokio::test]
async fn test_if_match_mismatch_fails_precondition() {
    let server = common::setup();
    server.insert(common::file("doc.txt", 3), "doc");

    let reply = server.get("/doc.txt", &[("if-match", "\"other\"")]).await;
    assert_eq!(reply.status, StatusCode::PRECONDITION_FAILED);

    let reply = server.get("/doc.txt", &[("if-match", "*")]).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn test_head_reports_headers_without_charging() {
    let server = common::setup();
    let mut metadata = common::file("once.txt", 4);
    metadata.max_downloads = 1;
    server.insert(metadata, "once");

    let request = Request::builder()
        .method("HEAD")
        .uri("/once.txt")
        .body(Body::empty())
        .unwrap();
    let reply = server.send(request).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.header("content-length"), Some("4"));
    assert!(reply.body.is_empty());
    assert!(reply.set_cookies().is_empty());
    assert_eq!(server.backend.metadata("once.txt").unwrap().max_downloads, 1);
}

#[tokio::test]
async fn test_range_requests() {
    let server = common::setup();
    let mut metadata = common::file("digits.txt", 10);
    metadata.max_downloads = 5;
    server.insert(metadata, "0123456789");

    let reply = server
        .get("/digits.txt", &[("range", "bytes=2-4"), (FORWARDED, "10.0.0.1")])
        .await;
    assert_eq!(reply.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(reply.body, b"234");
    assert_eq!(reply.header("content-range"), Some("bytes 2-4/10"));
    assert_eq!(reply.header("content-length"), Some("3"));
    assert_eq!(server.backend.metadata("digits.txt").unwrap().max_downloads, 4);

    // unsatisfiable ranges are not a download
    let reply = server
        .get("/digits.txt", &[("range", "bytes=50-"), (FORWARDED, "10.0.0.2")])
        .await;
    assert_eq!(reply.status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(reply.header("content-range"), Some("bytes */10"));
    assert!(reply.set_cookies().is_empty());
    assert_eq!(server.backend.metadata("digits.txt").unwrap().max_downloads, 4);
}

#[tokio::test]
async fn test_download_quota_with_dedup_cookie() {
    let server = common::setup();
    let mut metadata = common::file("abc123", 4);
    metadata.max_downloads = 2;
    server.insert(metadata, "data");

    // first view from A is charged and hands out the dedup cookie
    let reply = server.get("/abc123", &[(FORWARDED, "10.0.0.1")]).await;
    assert_eq!(reply.status, StatusCode::OK);
    let filehash = reply.cookie("filehash").expect("dedup cookie issued");
    assert_eq!(server.backend.metadata("abc123").unwrap().max_downloads, 1);

    // A again with its cookie: free
    let reply = server
        .get("/abc123", &[(FORWARDED, "10.0.0.1"), ("cookie", &filehash)])
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(server.backend.metadata("abc123").unwrap().max_downloads, 1);

    // A's cookie is worthless from another address
    let reply = server
        .get("/abc123", &[(FORWARDED, "10.0.0.2"), ("cookie", &filehash)])
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, b"data");

    // that was the last view
    assert!(!server.backend.contains("abc123"));
    let reply = server.get("/abc123", &[(FORWARDED, "10.0.0.1")]).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unlimited_file_sets_no_dedup_cookie() {
    let server = common::setup();
    server.insert(common::file("free.txt", 4), "free");

    for _ in 0..3 {
        let reply = server.get("/free.txt", &[(FORWARDED, "10.0.0.1")]).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.cookie("filehash").is_none());
    }
    assert_eq!(server.backend.put_metadata_calls(), 0);
}

#[tokio::test]
async fn test_site_path_prefix() {
    let server = common::setup_with(service::SiteConfig {
        site_path: "/share/".to_string(),
        ..Default::default()
    });
    server.insert(common::file("hello.txt", 5), "hello");

    let reply = server.get("/share/hello.txt", &[]).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = server.get("/hello.txt", &[]).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_accounting_failure_still_serves_bytes() {
    let server = common::setup();
    let mut metadata = common::file("flaky.txt", 5);
    metadata.max_downloads = 2;
    server.insert(metadata, "flaky");
    server.backend.set_fail_writes(true);

    let reply = server.get("/flaky.txt", &[(FORWARDED, "10.0.0.1")]).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, b"flaky");
    // nothing was charged, so nothing to dedup against
    assert!(reply.cookie("filehash").is_none());
    assert_eq!(server.backend.metadata("flaky.txt").unwrap().max_downloads, 2);
}

#[tokio::test]
async fn test_corrupt_metadata_is_server_error() {
    let server = common::setup();
    server.insert(common::file("broken.txt", 3), "bad");
    server.backend.mark_corrupt("broken.txt");

    let reply = server
        .get("/broken.txt", &[("accept", "application/json")])
        .await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
    assert_eq!(body["msg"], "Corrupt metadata.");
    assert_eq!(server.backend.serve_calls(), 0);
}
