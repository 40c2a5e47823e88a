#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|pattern: &str| {
    // Planning must never panic, whatever the pattern; invalid syntax
    // degrades to the match-everything query.
    let _ = zipdex::tri::regexp_query(pattern, false);
    let _ = zipdex::tri::regexp_query(pattern, true);
});
