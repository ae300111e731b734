use poem::{handler, web::Json};
use serde_json::{json, Value};

#[handler]
pub async fn health() -> Json<Value> {
    Json(json!({ "message": "ok" }))
}
