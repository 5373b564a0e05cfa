use serde::Serialize;

use crate::models::{Subscription, Tier};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub tier: Tier,
    pub subscription: Option<Subscription>,
}
