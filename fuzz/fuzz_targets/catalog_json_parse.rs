#![no_main]

use libfuzzer_sys::fuzz_target;
use tau_messaging::{parse_catalog_json, render_catalog_validate_report, validate_catalog};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    if let Ok(catalog) = parse_catalog_json(&raw) {
        let report = validate_catalog(&catalog);
        assert_eq!(report.total_messages, catalog.messages.len());
        assert_eq!(
            report.valid_messages + report.malformed_messages,
            report.total_messages
        );
        assert_eq!(
            report.diagnostics.len(),
            report.malformed_messages + report.duplicate_ids
        );
        assert!(render_catalog_validate_report(&report).starts_with("messaging validate:"));
    }
});
