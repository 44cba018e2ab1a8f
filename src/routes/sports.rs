use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::courts::reservation_url;
use crate::routes::availability::AppState;

/// A court with a link to its booking page.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourtLink {
    /// Portal course id
    pub id: String,
    pub name: String,
    /// Detail page on the reservation portal
    pub reservation_url: String,
}

/// Response item for GET /sports.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SportResponse {
    /// Key accepted by `/availability?sport=`
    pub sport: String,
    pub display_name: String,
    pub courts: Vec<CourtLink>,
}

/// List the configured sports and their courts.
#[utoipa::path(
    get,
    path = "/sports",
    tag = "Sports",
    responses(
        (status = 200, description = "Configured sports, ordered by key", body = Vec<SportResponse>),
    )
)]
pub(crate) async fn list_sports(State(state): State<AppState>) -> Json<Vec<SportResponse>> {
    let sports = state
        .registry
        .sports()
        .map(|(key, config)| SportResponse {
            sport: key.to_string(),
            display_name: config.display_name.clone(),
            courts: config
                .courts
                .iter()
                .map(|court| CourtLink {
                    id: court.id.clone(),
                    name: court.name.clone(),
                    reservation_url: reservation_url(&state.settings.base_url, &court.id),
                })
                .collect(),
        })
        .collect();

    Json(sports)
}
