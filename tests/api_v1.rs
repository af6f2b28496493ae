mod common;

use common::*;
use serde_json::{Value, json};
use sessiongate::api;
use sessiongate::server::Server;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use warp::Filter;
use warp::http::StatusCode;

fn api_filter(
    h: &Harness,
) -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone + 'static
{
    let server = Arc::new(Server::new(h.service.clone(), Duration::from_secs(5)));
    warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(server))
        .recover(api::v1::recover_error)
}

fn body(res: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

async fn login(h: &Harness, email: &str, password: &str) -> warp::http::Response<warp::hyper::body::Bytes> {
    warp::test::request()
        .method("POST")
        .path("/api/v1/auth/login")
        .remote_addr("198.51.100.4:40000".parse::<SocketAddr>().unwrap())
        .json(&json!({ "email": email, "password": password }))
        .reply(&api_filter(h))
        .await
}

fn access_token(v: &Value) -> String {
    v["data"]["auth_tokens"]["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn login_then_me() {
    let h = Harness::new();
    let alice = h.alice().await;

    let res = login(&h, ALICE, ALICE_PW).await;
    assert_eq!(res.status(), StatusCode::OK);
    let v = body(&res);
    assert_eq!(v["success"], true);
    assert_eq!(v["data"]["user_id"], alice.to_string());
    assert!(v["data"]["auth_tokens"]["refresh_token"].is_string());
    assert!(v["error"].is_null());

    let res = warp::test::request()
        .method("GET")
        .path("/api/v1/auth/me")
        .header("authorization", format!("Bearer {}", access_token(&v)))
        .reply(&api_filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let me = body(&res);
    assert_eq!(me["data"]["email"], ALICE);
    assert_eq!(
        me["data"]["session_id"],
        v["data"]["auth_tokens"]["session_id"]
    );
}

#[tokio::test]
async fn failures_are_a_uniform_401() {
    let h = Harness::new();
    let alice = h.alice().await;

    let res = login(&h, ALICE, "wrong").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let v = body(&res);
    assert_eq!(v["success"], false);
    assert_eq!(v["error"]["code"], "Unauthorized");

    let unknown = body(&login(&h, "nobody@example.com", "wrong").await);
    assert_eq!(unknown["error"], v["error"]);

    let attempts = h.failed_logins.attempts_of(alice);
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].client_ip, Some("198.51.100.4".parse().unwrap()));

    let res = warp::test::request()
        .method("GET")
        .path("/api/v1/auth/me")
        .reply(&api_filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = warp::test::request()
        .method("GET")
        .path("/api/v1/auth/me")
        .header("authorization", "Basic abc")
        .reply(&api_filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_and_replay() {
    let h = Harness::new();
    h.alice().await;
    let v = body(&login(&h, ALICE, ALICE_PW).await);
    let refresh_token = v["data"]["auth_tokens"]["refresh_token"].clone();

    let refresh = |token: Value| {
        let filter = api_filter(&h);
        async move {
            warp::test::request()
                .method("POST")
                .path("/api/v1/auth/refresh")
                .json(&json!({ "refresh_token": token }))
                .reply(&filter)
                .await
        }
    };

    let res = refresh(refresh_token.clone()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let rotated = body(&res);
    assert_ne!(rotated["data"]["refresh_token"], refresh_token);
    assert!(rotated["data"]["access_token"].is_string());

    let res = refresh(refresh_token).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_then_me_is_refused() {
    let h = Harness::new();
    h.alice().await;
    let token = access_token(&body(&login(&h, ALICE, ALICE_PW).await));
    let bearer = format!("Bearer {token}");

    for _ in 0..2 {
        let res = warp::test::request()
            .method("POST")
            .path("/api/v1/auth/logout")
            .header("authorization", bearer.as_str())
            .reply(&api_filter(&h))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(&res)["success"], true);
    }

    let res = warp::test::request()
        .method("GET")
        .path("/api/v1/auth/me")
        .header("authorization", bearer.as_str())
        .reply(&api_filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_all_reports_retired_sessions() {
    let h = Harness::new();
    h.alice().await;
    login(&h, ALICE, ALICE_PW).await;
    let token = access_token(&body(&login(&h, ALICE, ALICE_PW).await));

    let res = warp::test::request()
        .method("POST")
        .path("/api/v1/auth/logout_all")
        .header("authorization", format!("Bearer {token}"))
        .reply(&api_filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(&res)["data"]["revoked_sessions"], 2);
}

#[tokio::test]
async fn malformed_requests() {
    let h = Harness::new();

    let res = warp::test::request()
        .method("POST")
        .path("/api/v1/auth/login")
        .header("content-type", "application/json")
        .body("{\"email\": 1")
        .reply(&api_filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&res)["error"]["code"], "BadRequest");

    let res = warp::test::request()
        .method("GET")
        .path("/api/v1/auth/nothing-here")
        .reply(&api_filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
