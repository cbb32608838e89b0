use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{ActivationRequest, MessageResponse, RegisterRequest},
        extractors::AuthenticatedUser,
        services::{activate_user, register_user, validate_registration},
    },
    error::AppError,
    state::AppState,
};

pub const REGISTERED_MESSAGE: &str = "User registered. Please check your email for the code.";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/activate", post(activate))
}

/// Unix time in seconds with sub-second precision.
fn now() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let payload = json_body(payload)?;
    info!(email = %payload.email, "registration attempt");
    validate_registration(&payload.email, &payload.password)?;

    let user = register_user(
        state.users.as_ref(),
        state.mailer.as_ref(),
        &payload.email,
        &payload.password,
        now(),
    )
    .await?;

    info!(email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(MessageResponse::new(REGISTERED_MESSAGE))))
}

#[instrument(skip_all)]
pub async fn activate(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<ActivationRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let payload = json_body(payload)?;
    info!(email = %user.email, "activation attempt");
    let outcome = activate_user(state.users.as_ref(), &user, &payload.code, now()).await?;
    Ok(Json(MessageResponse::new(outcome.message())))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        Router,
    };
    use base64ct::{Base64, Encoding};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        auth::{memory_repo::InMemoryUserStore, password::hash_password, repo_types::User},
        mailer::fake::RecordingMailer,
    };

    struct Harness {
        app: Router,
        store: Arc<InMemoryUserStore>,
        mailer: Arc<RecordingMailer>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryUserStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::from_parts(store.clone(), mailer.clone());
        Harness {
            app: auth_routes().with_state(state),
            store,
            mailer,
        }
    }

    fn basic(email: &str, password: &str) -> String {
        format!(
            "Basic {}",
            Base64::encode_string(format!("{email}:{password}").as_bytes())
        )
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn register_req(email: &str, password: &str) -> Request<Body> {
        Request::post("/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": email, "password": password }).to_string(),
            ))
            .unwrap()
    }

    fn activate_req(auth: Option<String>, code: &str) -> Request<Body> {
        let mut builder = Request::post("/activate").header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder
            .body(Body::from(json!({ "code": code }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn full_registration_and_activation_flow() {
        let h = harness();

        let (status, body) = call(&h.app, register_req("user@example.com", "password123")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], REGISTERED_MESSAGE);

        let stored = h.store.get("user@example.com").unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.activation_code.len(), 4);
        assert!(stored.activation_code.chars().all(|c| c.is_ascii_digit()));
        let code = h.mailer.last_code_for("user@example.com").unwrap();
        assert_eq!(code, stored.activation_code);

        let auth = basic("user@example.com", "password123");
        let (status, body) = call(&h.app, activate_req(Some(auth.clone()), &code)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Account activated successfully");
        assert!(h.store.get("user@example.com").unwrap().is_active);

        let (status, body) = call(&h.app, activate_req(Some(auth), &code)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Already active");
    }

    #[tokio::test]
    async fn second_registration_is_rejected() {
        let h = harness();
        let (status, _) = call(&h.app, register_req("user@example.com", "password123")).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(&h.app, register_req("user@example.com", "another-password")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Email already registered");
    }

    #[tokio::test]
    async fn registration_validates_input() {
        let h = harness();
        let (status, _) = call(&h.app, register_req("not-an-email", "password123")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = call(&h.app, register_req("user@example.com", "short")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let req = Request::post("/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"user@example.com"}"#))
            .unwrap();
        let (status, body) = call(&h.app, req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
        assert_eq!(h.store.len(), 0);
    }

    #[tokio::test]
    async fn registration_succeeds_when_mail_delivery_fails() {
        let store = Arc::new(InMemoryUserStore::new());
        let state = AppState::from_parts(store.clone(), Arc::new(RecordingMailer::failing()));
        let app = auth_routes().with_state(state);

        let (status, _) = call(&app, register_req("user@example.com", "password123")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(store.get("user@example.com").is_some());
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let h = harness();
        h.store.insert(User {
            email: "expired@example.com".into(),
            password_hash: hash_password("password123").unwrap(),
            activation_code: "9999".into(),
            code_expires_at: now() - 10.0,
            is_active: false,
        });

        let auth = basic("expired@example.com", "password123");
        let (status, body) = call(&h.app, activate_req(Some(auth), "9999")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Code expired");
        assert!(!h.store.get("expired@example.com").unwrap().is_active);
    }

    #[tokio::test]
    async fn wrong_code_is_rejected() {
        let h = harness();
        h.store.insert(User {
            email: "wrongcode@example.com".into(),
            password_hash: hash_password("password123").unwrap(),
            activation_code: "1234".into(),
            code_expires_at: now() + 60.0,
            is_active: false,
        });

        let auth = basic("wrongcode@example.com", "password123");
        let (status, body) = call(&h.app, activate_req(Some(auth), "4321")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Invalid code");
        assert!(!h.store.get("wrongcode@example.com").unwrap().is_active);
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized_before_code_checks() {
        let h = harness();
        h.store.insert(User {
            email: "user@example.com".into(),
            password_hash: hash_password("correct_password").unwrap(),
            activation_code: "1234".into(),
            code_expires_at: now() - 10.0,
            is_active: false,
        });

        let (status, body) = call(
            &h.app,
            activate_req(Some(basic("user@example.com", "wrong_password")), "1234"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Incorrect email or password");

        let (status, unknown) = call(
            &h.app,
            activate_req(Some(basic("ghost@example.com", "correct_password")), "1234"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown, body);

        let res = h.app.clone().oneshot(activate_req(None, "1234")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Basic");

        let (status, body) = call(&h.app, activate_req(None, "1234")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Not authenticated");
    }
}
