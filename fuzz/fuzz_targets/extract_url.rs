#![no_main]

use libfuzzer_sys::fuzz_target;
use phishguard::features::extract;
use phishguard::schema::FeatureSchema;

fuzz_target!(|data: &[u8]| {
    // Extraction is total: any UTF-8 string must yield a finite feature row
    if let Ok(input) = std::str::from_utf8(data) {
        let features = extract(input);
        assert_eq!(features.url_length, input.chars().count());
        assert!(features.host_entropy.is_finite() && features.host_entropy >= 0.0);

        let row = FeatureSchema::canonical().project(&features);
        assert_eq!(row.values.len(), 5);
    }
});
