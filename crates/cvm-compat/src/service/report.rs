//! # Compatibility Report
//!
//! Plain-text rendering of a [`MigrationStatus`] for RPC and logs.

use crate::domain::entities::MigrationStatus;
use crate::domain::features::format_feature_flags;
use std::fmt::Write;

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Render `status` as a human readable report.
#[must_use]
pub fn format_compatibility_report(status: &MigrationStatus) -> String {
    let mut report = String::from("=== Compatibility Report ===\n");
    let _ = writeln!(report, "Height: {}", status.height);
    let _ = writeln!(
        report,
        "Active Features: {}",
        format_feature_flags(status.active_features)
    );
    let _ = writeln!(report, "CVM Contracts Valid: {}", yes_no(status.cvm_contracts_valid));
    let _ = writeln!(report, "EVM Features Ready: {}", yes_no(status.evm_features_ready));
    let _ = writeln!(report, "Trust Data Preserved: {}", yes_no(status.trust_data_preserved));
    let _ = writeln!(report, "Node Compatible: {}", yes_no(status.node_compatible));

    for (title, lines) in [("Warnings", &status.warnings), ("Errors", &status.errors)] {
        if lines.is_empty() {
            continue;
        }
        let _ = writeln!(report, "\n{title}:");
        for line in lines {
            let _ = writeln!(report, "  - {line}");
        }
    }
    report
}
