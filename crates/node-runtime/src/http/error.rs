//! HTTP error mapping.
//!
//! Every failure leaves the node as `{success:false, error_code, message}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared_types::{ErrorBody, ErrorCode};
use thiserror::Error;
use tm_01_standings::StandingsError;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Standings(#[from] StandingsError),

    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid bearer token")]
    InvalidToken,

    #[error("identity provider unavailable")]
    IdentityUnavailable,

    #[error("metrics unavailable: {0}")]
    Metrics(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Standings(e) => match e {
                StandingsError::NotFound(_) => StatusCode::NOT_FOUND,
                StandingsError::Duplicate(_)
                | StandingsError::VersionConflict { .. }
                | StandingsError::Consistency { .. } => StatusCode::CONFLICT,
                StandingsError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                StandingsError::WrongTournament { .. }
                | StandingsError::SameTeam { .. }
                | StandingsError::ScoreOverflow { .. } => StatusCode::BAD_REQUEST,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::IdentityUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Standings(e) => e.error_code(),
            Self::BadRequest(_) => ErrorCode::BadRequest,
            Self::Unauthenticated | Self::InvalidToken => ErrorCode::Unauthorized,
            Self::IdentityUnavailable | Self::Metrics(_) => ErrorCode::InternalError,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(ErrorBody::new(self.error_code(), self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{MatchId, TeamId, TournamentId};

    #[test]
    fn test_standings_errors_map_to_status_and_code() {
        let not_found = ApiError::from(StandingsError::NotFound(TournamentId(9)));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.error_code(), ErrorCode::NotFound);

        let duplicate = ApiError::from(StandingsError::Duplicate(MatchId(1)));
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
        assert_eq!(duplicate.error_code(), ErrorCode::BadRequest);

        let overflow = ApiError::from(StandingsError::ScoreOverflow {
            match_id: MatchId(2),
            team_id: TeamId(1),
        });
        assert_eq!(overflow.status(), StatusCode::BAD_REQUEST);
        assert_eq!(overflow.error_code(), ErrorCode::BadRequest);

        let storage = ApiError::from(StandingsError::Storage("disk".into()));
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(storage.error_code(), ErrorCode::InternalError);
    }

    #[test]
    fn test_auth_errors_are_unauthorized() {
        assert_eq!(ApiError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Unauthenticated.error_code(),
            ErrorCode::Unauthorized
        );
    }
}
