//! Composite key construction.
//!
//! All multi-part keys are fixed-width big-endian so LMDB's lexicographic
//! order matches `(prefix, time, id)` order and a prefix range-scan yields
//! one member/business pair in chronological order.

use perkpass_types::{BenefitId, BusinessId, MemberId, RedemptionId, Timestamp};

/// `business ++ benefit_id_be`
pub fn benefit_key(business: &BusinessId, benefit: BenefitId) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(business.as_bytes());
    key.extend_from_slice(&benefit.get().to_be_bytes());
    key
}

/// `member ++ business`
pub fn pair_prefix(member: &MemberId, business: &BusinessId) -> Vec<u8> {
    let mut key = Vec::with_capacity(48);
    key.extend_from_slice(member.as_bytes());
    key.extend_from_slice(business.as_bytes());
    key
}

/// `prefix ++ used_at_be ++ id_be`
pub fn timed_key(prefix: &[u8], used_at: Timestamp, id: RedemptionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 16);
    key.extend_from_slice(prefix);
    key.extend_from_slice(&used_at.as_secs().to_be_bytes());
    key.extend_from_slice(&id.get().to_be_bytes());
    key
}

/// `prefix ++ since_be`: the lowest timed key at or after `since`.
pub fn timed_lower_bound(prefix: &[u8], since: Timestamp) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 8);
    key.extend_from_slice(prefix);
    key.extend_from_slice(&since.as_secs().to_be_bytes());
    key
}

/// Turn `prefix` into the smallest key greater than every key it prefixes.
///
/// Returns `false` when the prefix is all `0xff` and has no successor; the
/// caller then scans to the end of the database.
pub fn increment_prefix(prefix: &mut Vec<u8>) -> bool {
    while let Some(last) = prefix.pop() {
        if last < u8::MAX {
            prefix.push(last + 1);
            return true;
        }
    }
    false
}

/// Decode the trailing big-endian redemption id of an index key.
pub fn trailing_id(key: &[u8]) -> Option<RedemptionId> {
    let tail: [u8; 8] = key.get(key.len().checked_sub(8)?..)?.try_into().ok()?;
    Some(RedemptionId::new(u64::from_be_bytes(tail)))
}
