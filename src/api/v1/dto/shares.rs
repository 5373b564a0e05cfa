use serde::{Deserialize, Serialize};

use crate::models::{Role, Share};

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct ShareListResponse {
    pub shares: Vec<Share>,
}
