mod aggregate;
mod config;
mod error;
mod models;
mod tracker;
mod views;

use anyhow::Result;

use poem::{
    get,
    listener::TcpListener,
    middleware::{CatchPanic, Cors, Tracing},
    Endpoint, EndpointExt, Route, Server,
};

use crate::config::Config;
use crate::tracker::TrackerClient;

fn setup_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();
}

pub fn routes() -> Route {
    Route::new()
        .at("/health", get(views::health::health))
        .at("/alerts", get(views::reports::alerts))
        .at("/comments", get(views::reports::comments))
        .at("/:board_id/allSprints", get(views::sprints::all_sprints))
        .at("/:board_id/activeSprint", get(views::sprints::active_sprint))
        .at("/:board_id/sprints", get(views::sprints::sprints))
        .at("/:board_id/stories", get(views::issues::board_stories))
        .at("/:board_id/sprint/progress", get(views::issues::board_progress))
        .at(
            "/:board_id/sprint/story/progress",
            get(views::issues::board_status_groups),
        )
        .at("/:board_id/sprint/members", get(views::issues::board_members))
        .at("/sprint/:sprint_id/stories", get(views::issues::sprint_stories))
        .at("/sprint/:sprint_id/progress", get(views::issues::sprint_progress))
        .at(
            "/sprint/:sprint_id/subtasks/progress",
            get(views::issues::sprint_status_groups),
        )
        .at("/sprint/:sprint_id/members", get(views::issues::sprint_members))
}

/// Shared state and middleware around a route table.
pub fn with_middleware(routes: Route, config: &Config) -> Result<impl Endpoint> {
    let tracker = TrackerClient::new(&config.tracker)?;

    let app = routes
        .data(tracker)
        .data(views::reports::ReportSettings::from(config))
        .with(Cors::new())
        .with(Tracing)
        .with(CatchPanic::new())
        .inspect_all_err(views::utils::log_error);

    Ok(app)
}

pub fn app(config: &Config) -> Result<impl Endpoint> {
    with_middleware(routes(), config)
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    let config = Config::from_env()?;
    tracing::info!(
        tracker = %config.tracker.base_url,
        bind_addr = %config.bind_addr,
        "starting sprintboard"
    );

    Server::new(TcpListener::bind(config.bind_addr.clone()))
        .run(app(&config)?)
        .await?;

    Ok(())
}
