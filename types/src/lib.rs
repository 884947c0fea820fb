//! Fundamental types for PerkPass.
//!
//! This crate defines the records shared across every other crate in the
//! workspace: identifiers, timestamps, members, businesses, benefits,
//! redemptions, and the protocol parameters that govern redemption.

pub mod benefit;
pub mod business;
pub mod error;
pub mod ids;
pub mod member;
pub mod params;
pub mod redemption;
pub mod time;

pub use benefit::Benefit;
pub use business::Business;
pub use error::TypesError;
pub use ids::{BenefitId, BusinessId, MemberId, RedemptionId};
pub use member::{Member, MembershipType};
pub use params::RedemptionParams;
pub use redemption::{NewRedemption, Redemption, RedemptionStatus};
pub use time::{Clock, SystemClock, Timestamp};
