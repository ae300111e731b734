use poem::{
    handler,
    web::{Data, Json, Path},
    Result,
};
use serde_json::{json, Value};

use crate::aggregate::{flatten_sprints, select_active_sprint};
use crate::tracker::TrackerClient;

/// Every sprint of the board, as the tracker returns it.
#[handler]
pub async fn all_sprints(
    Path(board_id): Path<String>,
    Data(tracker): Data<&TrackerClient>,
) -> Result<Json<Value>> {
    let page = tracker.board_sprints(&board_id).await?;
    Ok(Json(json!({ "sprints": page.values })))
}

#[handler]
pub async fn active_sprint(
    Path(board_id): Path<String>,
    Data(tracker): Data<&TrackerClient>,
) -> Result<Json<Value>> {
    let page = tracker.board_sprints(&board_id).await?;
    let active = select_active_sprint(&page.values);
    if active.is_none() {
        tracing::info!(board_id = %board_id, "board has no active or closed sprint");
    }
    Ok(Json(json!({ "active_sprint": active })))
}

#[handler]
pub async fn sprints(
    Path(board_id): Path<String>,
    Data(tracker): Data<&TrackerClient>,
) -> Result<Json<Value>> {
    let page = tracker.board_sprints(&board_id).await?;
    Ok(Json(json!({ "sprints": flatten_sprints(&page.values) })))
}
