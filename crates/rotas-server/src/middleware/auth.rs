// Authentication middleware for Actix-web

use std::collections::HashMap;

use actix_service::forward_ready;
use actix_utils::future::{Ready, ok};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    web::{self, Data},
};
use chrono::Utc;
use futures::future::LocalBoxFuture;

use crate::model::common::{AppState, AuthContext};

const ACCESS_TOKEN_HEADER: &str = "accessToken";
const AUTHORIZATION_HEADER: &str = "Authorization";
const BEARER_PREFIX: &str = "Bearer ";
const TOKEN_QUERY_PARAM: &str = "token";

/// Resolves the bearer token on each request into an [`AuthContext`] and
/// records panel access after the response is produced.
///
/// The middleware never rejects a request itself. Handlers read the
/// context from the request extensions and decide between 401 and 403.
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthenticationMiddleware { service })
    }
}

pub struct AuthenticationMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // CORS preflight carries no credentials
        if req.method() == Method::OPTIONS {
            req.extensions_mut().insert(AuthContext::default());
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let context = resolve_context(&req);
        let log_target = req
            .app_data::<Data<AppState>>()
            .filter(|_| context.authenticated())
            .map(|data| {
                (
                    data.access_log.clone(),
                    context.name.clone().unwrap_or_default(),
                    module_from_path(req.path()),
                )
            });

        req.extensions_mut().insert(context);

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await.map(ServiceResponse::map_into_left_body)?;
            if let Some((access_log, token_name, module)) = log_target {
                access_log.log(&token_name, &module, Utc::now());
            }
            Ok(res)
        })
    }
}

fn extract_token(req: &ServiceRequest) -> Option<String> {
    if let Some(auth_header) = req.headers().get(AUTHORIZATION_HEADER)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix(BEARER_PREFIX)
        && !token.is_empty()
    {
        return Some(token.to_string());
    }

    if let Some(header_value) = req.headers().get(ACCESS_TOKEN_HEADER)
        && let Ok(token) = header_value.to_str()
        && !token.is_empty()
    {
        return Some(token.to_string());
    }

    web::Query::<HashMap<String, String>>::from_query(req.query_string())
        .ok()
        .and_then(|params| params.get(TOKEN_QUERY_PARAM).cloned())
        .filter(|token| !token.is_empty())
}

fn resolve_context(req: &ServiceRequest) -> AuthContext {
    let Some(token) = extract_token(req) else {
        return AuthContext::default();
    };

    let resolved = req
        .app_data::<Data<AppState>>()
        .and_then(|data| data.resolve_token(&token).cloned());

    match resolved {
        Some(def) => AuthContext {
            token: Some(def.token),
            name: Some(def.name),
            staff: def.staff,
            apps: def.apps,
            token_provided: true,
        },
        // Unknown tokens stay in the context so the ingest handler can
        // compare them against the ingest token.
        None => AuthContext {
            token: Some(token),
            token_provided: true,
            ..AuthContext::default()
        },
    }
}

/// Access-log module key for a request path.
fn module_from_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] => "home".to_string(),
        ["api", area, ..] => (*area).to_string(),
        [first, ..] => (*first).to_string(),
    }
}
