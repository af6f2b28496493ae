use super::error::*;
use super::handler;
use crate::application_port::*;
use crate::server::*;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::{Filter, http, reject};

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_context(server.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_context(server.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(bearer_token())
        .and(with_context(server.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let me = warp::get()
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(with_verification(server.clone()))
        .and_then(handler::me);

    let logout_all = warp::post()
        .and(warp::path("logout_all"))
        .and(warp::path::end())
        .and(with_verification(server.clone()))
        .and(with_context(server.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout_all);

    warp::path("auth").and(login.or(refresh).or(logout).or(me).or(logout_all))
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Per-request context: child of the server's shutdown token, bounded by the
/// configured timeout, tagged with the peer address.
fn with_context(
    server: Arc<Server>,
) -> impl Filter<Extract = (RequestContext,), Error = Infallible> + Clone {
    warp::addr::remote().map(move |addr: Option<SocketAddr>| {
        server
            .request_context()
            .with_client_ip(addr.map(|a| a.ip()))
    })
}

fn bearer_token() -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_str()).and_then(
        |header: Option<String>| async move {
            header
                .as_deref()
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .ok_or_else(|| reject::custom(ApiErrorCode::Unauthorized))
        },
    )
}

fn with_verification(
    server: Arc<Server>,
) -> impl Filter<Extract = (UserIdentity,), Error = warp::Rejection> + Clone {
    bearer_token()
        .and(with_context(server.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(
            |token: String, ctx: RequestContext, auth_service: Arc<dyn AuthService>| async move {
                auth_service
                    .verify_token(&token, &ctx)
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)
            },
        )
}
