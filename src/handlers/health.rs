use axum::Json;

pub async fn root() -> &'static str {
    "Style Decor server running!"
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
