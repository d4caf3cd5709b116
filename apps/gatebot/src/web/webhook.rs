use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use teloxide::types::Update;

use super::WebState;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

pub async fn receive_update(
    State(state): State<WebState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let Some(updates) = &state.updates else {
        return (StatusCode::NOT_FOUND, Json(json!({ "ok": false })));
    };

    if let Some(expected) = &state.secret {
        let given = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if given != Some(expected.as_str()) {
            tracing::warn!("Rejected webhook call with bad secret token");
            return (StatusCode::UNAUTHORIZED, Json(json!({ "ok": false })));
        }
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!("Rejected malformed webhook payload: {}", e);
            return (StatusCode::BAD_REQUEST, Json(json!({ "ok": false })));
        }
    };

    tracing::debug!("Webhook update {:?} queued", update.id);
    if updates.send(update).await.is_err() {
        tracing::error!("Update consumer is gone, dropping update");
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "ok": false })));
    }

    (StatusCode::OK, Json(json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use tokio::sync::mpsc;

    fn state(secret: Option<&str>) -> (WebState, mpsc::Receiver<Update>) {
        let (tx, rx) = mpsc::channel(4);
        (
            WebState {
                secret: secret.map(str::to_string),
                updates: Some(tx),
            },
            rx,
        )
    }

    #[tokio::test]
    async fn polling_mode_has_no_webhook() {
        let web = WebState {
            secret: None,
            updates: None,
        };
        let (status, _) = receive_update(State(web), HeaderMap::new(), Bytes::from_static(b"{}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_or_wrong_secret_is_unauthorized() {
        let (web, mut rx) = state(Some("s3cret"));

        let (status, _) =
            receive_update(State(web.clone()), HeaderMap::new(), Bytes::from_static(b"{}")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut headers = HeaderMap::new();
        headers.insert(SECRET_HEADER, HeaderValue::from_static("nope"));
        let (status, _) = receive_update(State(web), headers, Bytes::from_static(b"{}")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn garbage_body_is_bad_request() {
        let (web, _rx) = state(Some("s3cret"));
        let mut headers = HeaderMap::new();
        headers.insert(SECRET_HEADER, HeaderValue::from_static("s3cret"));

        let (status, _) =
            receive_update(State(web), headers, Bytes::from_static(b"not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn valid_update_is_queued() {
        let (web, mut rx) = state(Some("s3cret"));
        let mut headers = HeaderMap::new();
        headers.insert(SECRET_HEADER, HeaderValue::from_static("s3cret"));
        let body = json!({
            "update_id": 10,
            "message": {
                "message_id": 1,
                "date": 1700000000,
                "chat": { "id": 42, "type": "private", "first_name": "Ann" },
                "from": { "id": 42, "is_bot": false, "first_name": "Ann" },
                "text": "/start"
            }
        });

        let (status, Json(reply)) =
            receive_update(State(web), headers, Bytes::from(body.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply, json!({ "ok": true }));
        let update = rx.try_recv().unwrap();
        assert_eq!(update.id.0, 10);
        assert!(matches!(update.kind, teloxide::types::UpdateKind::Message(_)));
    }
}
