//! Encoding, strict decoding and issuance of membership codes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use perkpass_types::MemberId;
use rand::Rng;

use crate::{BearerToken, DecodeError};

/// Field separator inside the decoded payload.
pub const DELIMITER: char = '|';

/// Longest raw code accepted. A valid code is well under 100 characters;
/// anything near this limit is scanner noise.
pub const MAX_CODE_LEN: usize = 512;

const FIELD_COUNT: usize = 3;
const NONCE_LEN: usize = 6;
const NONCE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Encode a token as the text embedded in a QR image.
///
/// The nonce must not contain [`DELIMITER`]; tokens built by [`issue`] or
/// returned by [`decode`] always satisfy this.
pub fn encode(token: &BearerToken) -> String {
    let payload = format!(
        "{}{DELIMITER}{}{DELIMITER}{}",
        token.member_id, token.issued_at_millis, token.nonce
    );
    STANDARD.encode(payload)
}

/// Decode a scanned or pasted code.
///
/// Leading and trailing whitespace (common with keyboard-wedge scanners) is
/// ignored; everything else must match the canonical layout exactly.
pub fn decode(raw: &str) -> Result<BearerToken, DecodeError> {
    let raw = raw.trim();
    if raw.len() > MAX_CODE_LEN {
        return Err(DecodeError::TooLong {
            len: raw.len(),
            max: MAX_CODE_LEN,
        });
    }

    let bytes = STANDARD.decode(raw).map_err(|_| DecodeError::NotBase64)?;
    let payload = String::from_utf8(bytes).map_err(|_| DecodeError::NotBase64)?;

    let fields: Vec<&str> = payload.split(DELIMITER).collect();
    let [member, issued_at, nonce] = fields.as_slice() else {
        return Err(DecodeError::WrongArity {
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    };

    let member_id = member
        .parse::<MemberId>()
        .map_err(|_| DecodeError::MalformedIdentity((*member).to_string()))?;

    if issued_at.is_empty() || !issued_at.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::MalformedTimestamp((*issued_at).to_string()));
    }
    let issued_at_millis = issued_at
        .parse::<u64>()
        .map_err(|_| DecodeError::MalformedTimestamp((*issued_at).to_string()))?;

    if nonce.is_empty() {
        return Err(DecodeError::MalformedNonce);
    }

    Ok(BearerToken::new(member_id, issued_at_millis, *nonce))
}

/// Issue a fresh token for `member_id` with a random base-36 nonce.
pub fn issue<R: Rng + ?Sized>(member_id: MemberId, issued_at_millis: u64, rng: &mut R) -> BearerToken {
    let nonce: String = (0..NONCE_LEN)
        .map(|_| char::from(NONCE_ALPHABET[rng.gen_range(0..NONCE_ALPHABET.len())]))
        .collect();
    BearerToken::new(member_id, issued_at_millis, nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const MEMBER: &str = "4f9d2c1e-8b7a-4e6f-9a3b-1c2d3e4f5a6b";

    fn b64(payload: &str) -> String {
        STANDARD.encode(payload)
    }

    #[test]
    fn decodes_canonical_code() {
        let raw = b64(&format!("{MEMBER}|1700000000123|k3j9xq"));
        let token = decode(&raw).unwrap();
        assert_eq!(token.member_id.to_string(), MEMBER);
        assert_eq!(token.issued_at_millis, 1_700_000_000_123);
        assert_eq!(token.nonce, "k3j9xq");
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let raw = format!("  {}\n", b64(&format!("{MEMBER}|1|n")));
        assert!(decode(&raw).is_ok());
    }

    #[test]
    fn rejects_non_base64() {
        assert_eq!(decode("not base64 at all!"), Err(DecodeError::NotBase64));
        assert_eq!(decode("%%%%"), Err(DecodeError::NotBase64));
    }

    #[test]
    fn rejects_non_utf8_payload() {
        let raw = STANDARD.encode([0xff, 0xfe, 0xfd]);
        assert_eq!(decode(&raw), Err(DecodeError::NotBase64));
    }

    #[test]
    fn rejects_hyphen_delimited_legacy_layout() {
        let raw = b64(&format!("{MEMBER}-1700000000000-abc123"));
        assert_eq!(
            decode(&raw),
            Err(DecodeError::WrongArity {
                expected: 3,
                found: 1
            })
        );
    }

    #[test]
    fn rejects_extra_fields() {
        let raw = b64(&format!("{MEMBER}|1|n|extra"));
        assert!(matches!(
            decode(&raw),
            Err(DecodeError::WrongArity { found: 4, .. })
        ));
    }

    #[test]
    fn rejects_empty_code() {
        assert!(matches!(
            decode(""),
            Err(DecodeError::WrongArity { found: 1, .. })
        ));
    }

    #[test]
    fn rejects_truncated_uuid() {
        let raw = b64("4f9d2c1e|1|n");
        assert_eq!(
            decode(&raw),
            Err(DecodeError::MalformedIdentity("4f9d2c1e".into()))
        );
    }

    #[test]
    fn rejects_signed_or_empty_timestamp() {
        let raw = b64(&format!("{MEMBER}|+5|n"));
        assert_eq!(decode(&raw), Err(DecodeError::MalformedTimestamp("+5".into())));
        let raw = b64(&format!("{MEMBER}||n"));
        assert_eq!(decode(&raw), Err(DecodeError::MalformedTimestamp(String::new())));
    }

    #[test]
    fn rejects_empty_nonce() {
        let raw = b64(&format!("{MEMBER}|1|"));
        assert_eq!(decode(&raw), Err(DecodeError::MalformedNonce));
    }

    #[test]
    fn rejects_oversized_input() {
        let raw = "A".repeat(MAX_CODE_LEN + 4);
        assert!(matches!(decode(&raw), Err(DecodeError::TooLong { .. })));
    }

    #[test]
    fn issued_nonce_is_six_base36_chars() {
        let mut rng = StdRng::seed_from_u64(7);
        let member: MemberId = MEMBER.parse().unwrap();
        let token = issue(member, 1_700_000_000_000, &mut rng);
        assert_eq!(token.nonce.len(), NONCE_LEN);
        assert!(token
            .nonce
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
        assert_eq!(decode(&encode(&token)).unwrap(), token);
    }
}
