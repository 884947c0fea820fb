//! Business record, owned by the external onboarding flow.

use serde::{Deserialize, Serialize};

use crate::BusinessId;

/// A partner business. The redemption core only reads `id` to scope
/// benefit lookup; the name is carried for operator messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
}
