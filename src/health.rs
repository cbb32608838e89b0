use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependencies {
    pub database: Status,
    pub smtp: Status,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: Status,
    pub dependencies: Dependencies,
}

impl HealthReport {
    fn from_checks(database: Status, smtp: Status) -> Self {
        let status = if database == Status::Healthy && smtp == Status::Healthy {
            Status::Healthy
        } else {
            Status::Unhealthy
        };
        Self {
            status,
            dependencies: Dependencies { database, smtp },
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[instrument(skip(state))]
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthReport>, AppError> {
    let (db, smtp) = tokio::join!(state.users.ping(), state.mailer.check());

    let database = match db {
        Ok(()) => Status::Healthy,
        Err(e) => {
            error!(error = %e, "health check failed: database unreachable");
            Status::Unhealthy
        }
    };
    let smtp = match smtp {
        Ok(()) => Status::Healthy,
        Err(e) => {
            error!(error = %e, "health check failed: smtp server unreachable");
            Status::Unhealthy
        }
    };

    let report = HealthReport::from_checks(database, smtp);
    match report.status {
        Status::Healthy => Ok(Json(report)),
        Status::Unhealthy => Err(AppError::Unavailable(report)),
    }
}
