#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Trigram extraction and the text gate must accept arbitrary bytes
    // without panicking.
    let _ = zipdex::utils::extract_trigrams(data);
    let _ = zipdex::utils::detect_binary(data);
    let _ = zipdex::utils::valid_utf8_prefix(data, false);
    let _ = zipdex::utils::valid_utf8_prefix(data, true);
});
