//! Session bootstrap endpoint types.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Query parameters of the session bootstrap endpoint.
#[derive(Debug, Deserialize, Validate, IntoParams)]
pub struct BootstrapQuery {
    /// Activity instance id.
    #[validate(range(min = 1))]
    pub cmid: i64,
    /// Platform user id.
    #[validate(range(min = 1))]
    pub userid: i64,
    /// Group id, 0 for users without a group.
    #[serde(default)]
    pub groupid: i64,
}

/// Everything a web client needs to open the socket.
#[derive(Debug, Serialize, ToSchema)]
pub struct BootstrapResponse {
    /// Session key to present on the socket query string.
    pub skey: String,
    pub cmid: i64,
    pub userid: i64,
    pub usernames: String,
    pub userpicture: String,
    pub courseid: i64,
    pub courseshortname: String,
    pub groupid: i64,
    pub groupname: String,
    /// Socket URL to connect to.
    pub serverurl: String,
}
