#![no_main]

use libfuzzer_sys::fuzz_target;

// Decoding arbitrary scanner input must never panic, and anything that
// decodes must re-encode to a code that decodes to the same token.
fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(token) = perkpass_codec::decode(raw) {
        let again = perkpass_codec::decode(&perkpass_codec::encode(&token));
        assert_eq!(again.as_ref(), Ok(&token));
    }
});
