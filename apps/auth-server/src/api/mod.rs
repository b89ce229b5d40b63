// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_auth, Identity, SignInRequest, UnauthorizedTitle},
    models::{DappSession, Encoder, Network, UserSnapshot, WorkspaceRef},
    recover_codes::RecoverCodeKind,
    state::AppState,
};

pub mod auth;
pub mod health;
pub mod predicates;

pub fn router(state: AppState) -> Router {
    // Every route here resolves the credential before the handler runs.
    let protected = Router::new()
        .route("/auth/code", post(auth::request_code))
        .route("/auth/me", get(auth::me))
        .route("/predicate", get(predicates::list_predicates))
        .route("/predicate/{predicate_id}", get(predicates::get_predicate))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let v1_routes = Router::new()
        .route("/auth/challenge", post(auth::challenge))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-out", delete(auth::sign_out))
        .merge(protected)
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state)
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        auth::challenge,
        auth::sign_in,
        auth::sign_out,
        auth::request_code,
        auth::me,
        predicates::list_predicates,
        predicates::get_predicate
    ),
    components(
        schemas(
            Identity,
            UserSnapshot,
            WorkspaceRef,
            Network,
            Encoder,
            DappSession,
            RecoverCodeKind,
            UnauthorizedTitle,
            SignInRequest,
            auth::ChallengeRequest,
            auth::CodeRequest,
            auth::CodeResponse,
            auth::SignInResponse,
            predicates::PredicateListResponse,
            predicates::PredicateAccessResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Auth", description = "Sign-in, sign-out and credential issuance"),
        (name = "Predicates", description = "Vault access checks")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::sessions::tests::sample_session;
    use crate::test_fixtures::Fixture;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use chrono::Duration;
    use tower::ServiceExt;

    fn app(fx: &Fixture) -> (Router, AppState) {
        let state = AppState::new(fx.db.clone(), &AuthConfig::default(), None);
        (router(state.clone()), state)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let fx = Fixture::new();
        let (app, _) = app(&fx);
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn health_is_public() {
        let fx = Fixture::new();
        let (app, _) = app(&fx);
        let response = app.oneshot(get_request("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn protected_route_without_credentials_is_401() {
        let fx = Fixture::new();
        let (app, _) = app(&fx);
        let response = app.oneshot(get_request("/v1/auth/me", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["title"], "MISSING_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_token_is_session_not_found() {
        let fx = Fixture::new();
        let (app, _) = app(&fx);
        let response = app
            .oneshot(get_request("/v1/auth/me", Some("Bearer nope")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["title"], "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn me_returns_identity_for_session() {
        let fx = Fixture::new();
        let (app, state) = app(&fx);
        state
            .auth
            .sessions()
            .add(sample_session("tok", Duration::minutes(20)))
            .await
            .unwrap();

        let response = app
            .oneshot(get_request("/v1/auth/me", Some("Bearer tok")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["user"]["id"], "user-1");
        assert_eq!(body["workspace"]["id"], "ws-1");
    }

    #[tokio::test]
    async fn predicate_routes_enforce_workspace_permissions() {
        let fx = Fixture::new();
        let (user, workspace) = fx.user("user-a", "0xaaa");
        let (member, _) = fx.user("user-b", "0xbbb");
        let mut workspace = workspace;
        workspace.add_member(
            &member.id,
            crate::auth::Role::Signer,
            crate::workspace::ResourceScope::Only(vec!["R9".into()]),
        );
        fx.workspace(&workspace);
        fx.vault("R9", &workspace.id);
        fx.vault("R8", &workspace.id);

        let (app, state) = app(&fx);
        for (token, owner) in [("owner-tok", &user), ("member-tok", &member)] {
            let mut session = sample_session(token, Duration::minutes(20));
            session.user = UserSnapshot::from(owner);
            session.workspace = workspace.to_ref();
            state.auth.sessions().add(session).await.unwrap();
        }

        let response = app
            .clone()
            .oneshot(get_request("/v1/predicate", Some("Bearer owner-tok")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["predicates"], serde_json::json!(["R8", "R9"]));

        let response = app
            .clone()
            .oneshot(get_request("/v1/predicate", Some("Bearer member-tok")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(get_request("/v1/predicate/R9", Some("Bearer member-tok")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get_request("/v1/predicate/R8", Some("Bearer member-tok")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["title"], "MISSING_PERMISSION");

        let response = app
            .oneshot(get_request("/v1/predicate/unknown", Some("Bearer owner-tok")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn openapi_lists_auth_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/v1/auth/sign-in"));
        assert!(doc.paths.paths.contains_key("/v1/predicate/{predicate_id}"));
    }
}
