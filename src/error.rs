use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, messages};

/// Game-rule and protocol violations reported to the originating connection.
///
/// Every variant carries a stable wire code that clients key their UI on; the
/// human-readable text is resolved through the message catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Inbound payload was not valid JSON.
    #[error("invalid JSON payload")]
    InvalidJson,
    /// Inbound envelope carried no action name.
    #[error("an action is required")]
    ActionRequired,
    /// Connection attempted without a session key.
    #[error("a session key is required")]
    SkeyRequired,
    /// The supplied session key matched no session.
    #[error("invalid session key")]
    InvalidKey,
    /// The action name is unknown or not permitted for this channel.
    #[error("invalid action: {0}")]
    InvalidAction(String),
    /// The operation requires the session to belong to a group.
    #[error("no related group")]
    NotGroupNotTeam,
    /// A required payload field was missing.
    #[error("missing field: {0}")]
    FieldRequired(&'static str),
    /// The user does not belong to the group the operation targets.
    #[error("user not in group")]
    UserNotInGroup,
    /// The chat binding for this connection could not be resolved.
    #[error("chat not available")]
    ChatNotAvailable,
    /// The card code is not part of the case catalog.
    #[error("invalid card code")]
    InvalidCardCode,
    /// The card type is not one of the known roles.
    #[error("invalid card type")]
    InvalidCardType,
    /// The user does not hold the role required to play this card type.
    #[error("card type not allowed for this user")]
    TypeNotAllowed,
    /// No card of that type was played in the current attempt.
    #[error("card not played")]
    CardNotPlayed,
    /// A game slot is already active for this group.
    #[error("a game is already started")]
    GameAlreadyStarted,
    /// The action or technology id is not part of the catalog.
    #[error("unknown catalog item")]
    InvalidGameItem,
    /// The catalog item is not assigned to the requesting user.
    #[error("item not assigned to user")]
    NotAssignedItem,
    /// The catalog item is already in the running set.
    #[error("item already running")]
    AlreadyRunning,
    /// A prerequisite file is missing.
    #[error("required files not available")]
    NotRequiredFiles,
    /// A prerequisite technology is not running.
    #[error("required technologies not running")]
    NotRequiredTechnologies,
    /// The resource pool cannot cover the item's cost.
    #[error("insufficient resources")]
    NotResources,
    /// Stop requested for an action that is not running.
    #[error("action not running")]
    NotRunningAction,
    /// Stop requested for a technology that is not running.
    #[error("technology not running")]
    NotRunningTech,
    /// The technology is still required by a running action.
    #[error("technology required by a running action")]
    TechRunningRequired,
}

impl DomainError {
    /// Stable wire code for the error payload.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::InvalidJson => "invalidjson",
            DomainError::ActionRequired => "actionrequired",
            DomainError::SkeyRequired => "skeyrequired",
            DomainError::InvalidKey => "invalidkey",
            DomainError::InvalidAction(_) => "invalidaction",
            DomainError::NotGroupNotTeam => "notgroupnotteam",
            DomainError::FieldRequired(_) => "fieldrequired",
            DomainError::UserNotInGroup => "usernotintogroup",
            DomainError::ChatNotAvailable => "chatnotavailable",
            DomainError::InvalidCardCode => "invalidcardcode",
            DomainError::InvalidCardType => "invalidcardtype",
            DomainError::TypeNotAllowed => "typenotallowed",
            DomainError::CardNotPlayed => "carddontplayed",
            DomainError::GameAlreadyStarted => "errorgamestart",
            DomainError::InvalidGameItem => "invalidgameitem",
            DomainError::NotAssignedItem => "notassigneditem",
            DomainError::AlreadyRunning => "alreadyrunning",
            DomainError::NotRequiredFiles => "notrequiredfiles",
            DomainError::NotRequiredTechnologies => "notrequiredtechnologies",
            DomainError::NotResources => "notresources",
            DomainError::NotRunningAction => "notrunningaction",
            DomainError::NotRunningTech => "notrunningtech",
            DomainError::TechRunningRequired => "techrunningrequired",
        }
    }

    /// Substitution parameter for the localized message, when the variant carries one.
    pub fn param(&self) -> Option<String> {
        match self {
            DomainError::InvalidAction(name) => Some(name.clone()),
            DomainError::FieldRequired(name) => Some((*name).to_string()),
            _ => None,
        }
    }

    /// Localized display text for the error payload.
    pub fn localized(&self) -> String {
        messages::localize(self.code(), self.param().as_deref())
    }
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// A game-rule or protocol violation attributable to the request.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Domain(domain) => AppError::BadRequest(domain.localized()),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::Internal(message) => AppError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_codes_are_stable() {
        assert_eq!(DomainError::NotResources.code(), "notresources");
        assert_eq!(
            DomainError::InvalidAction("warp".into()).code(),
            "invalidaction"
        );
    }

    #[test]
    fn localized_text_substitutes_param() {
        let err = DomainError::InvalidAction("warp".into());
        assert_eq!(err.localized(), "Invalid action: warp");
    }
}
