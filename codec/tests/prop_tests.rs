use proptest::prelude::*;

use perkpass_codec::{decode, encode, BearerToken};
use perkpass_types::MemberId;
use uuid::Uuid;

proptest! {
    /// decode(encode(token)) returns the original token.
    #[test]
    fn encode_decode_roundtrip(
        bytes in prop::array::uniform16(0u8..),
        issued_at in 0u64..u64::MAX,
        nonce in "[a-z0-9]{1,16}",
    ) {
        let token = BearerToken::new(MemberId::new(Uuid::from_bytes(bytes)), issued_at, nonce);
        let decoded = decode(&encode(&token)).unwrap();
        prop_assert_eq!(decoded.member_id, token.member_id);
        prop_assert_eq!(decoded, token);
    }

    /// Decoding arbitrary text never panics.
    #[test]
    fn decode_never_panics(raw in ".{0,200}") {
        let _ = decode(&raw);
    }
}
