use poem::{
    handler,
    web::{Data, Json, Path},
    Result,
};
use serde_json::{json, Value};

use crate::aggregate::{
    compute_status_groups, compute_story_progress, extract_members, extract_stories, MemberScope,
};
use crate::tracker::TrackerClient;

#[handler]
pub async fn board_stories(
    Path(board_id): Path<String>,
    Data(tracker): Data<&TrackerClient>,
) -> Result<Json<Value>> {
    let page = tracker.board_issues(&board_id).await?;
    let stories = extract_stories(&page.issues)?;
    Ok(Json(json!({ "issues": stories })))
}

#[handler]
pub async fn sprint_stories(
    Path(sprint_id): Path<String>,
    Data(tracker): Data<&TrackerClient>,
) -> Result<Json<Value>> {
    let page = tracker.sprint_issues(&sprint_id).await?;
    let stories = extract_stories(&page.issues)?;
    Ok(Json(json!({ "issues": stories })))
}

#[handler]
pub async fn board_progress(
    Path(board_id): Path<String>,
    Data(tracker): Data<&TrackerClient>,
) -> Result<Json<Value>> {
    let page = tracker.board_issues(&board_id).await?;
    let progress = compute_story_progress(&page.issues)?;
    Ok(Json(json!({ "sprint_progress": progress })))
}

#[handler]
pub async fn sprint_progress(
    Path(sprint_id): Path<String>,
    Data(tracker): Data<&TrackerClient>,
) -> Result<Json<Value>> {
    let page = tracker.sprint_issues(&sprint_id).await?;
    let progress = compute_story_progress(&page.issues)?;
    tracing::debug!(sprint_id = %sprint_id, stories = progress.len(), "computed sprint progress");
    Ok(Json(json!({ "sprint_progress": progress })))
}

/// Sub-task counts per story and status category, across the board.
#[handler]
pub async fn board_status_groups(
    Path(board_id): Path<String>,
    Data(tracker): Data<&TrackerClient>,
) -> Result<Json<Value>> {
    let page = tracker.board_issues(&board_id).await?;
    let groups = compute_status_groups(&page.issues)?;
    Ok(Json(json!({ "values": groups })))
}

#[handler]
pub async fn sprint_status_groups(
    Path(sprint_id): Path<String>,
    Data(tracker): Data<&TrackerClient>,
) -> Result<Json<Value>> {
    let page = tracker.sprint_issues(&sprint_id).await?;
    let groups = compute_status_groups(&page.issues)?;
    Ok(Json(json!({ "values": groups })))
}

#[handler]
pub async fn board_members(
    Path(board_id): Path<String>,
    Data(tracker): Data<&TrackerClient>,
) -> Result<Json<Value>> {
    let page = tracker.board_issues(&board_id).await?;
    let members = extract_members(&page.issues, MemberScope::Board);
    Ok(Json(json!({ "members": members })))
}

#[handler]
pub async fn sprint_members(
    Path(sprint_id): Path<String>,
    Data(tracker): Data<&TrackerClient>,
) -> Result<Json<Value>> {
    let page = tracker.sprint_issues(&sprint_id).await?;
    let members = extract_members(&page.issues, MemberScope::Sprint);
    Ok(Json(json!({ "members": members })))
}
