//! Benefit storage trait.

use crate::StoreError;
use perkpass_types::{Benefit, BusinessId};

/// Read access to the benefits businesses offer.
pub trait BenefitStore: Send + Sync {
    /// All benefits of a business, in no particular order and without any
    /// activity or validity-window filtering.
    fn list_by_business(&self, business: &BusinessId) -> Result<Vec<Benefit>, StoreError>;
}
