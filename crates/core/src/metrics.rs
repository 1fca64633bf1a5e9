//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Provisioning runs (results, stage durations)
//! - Address allocation (probe counts)
//! - Group linking (resolutions, membership outcomes)
//! - Directory calls (token acquisition)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Provisioning
// =============================================================================

/// Provisioning runs total by result.
pub static PROVISIONING_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mailwright_provisioning_runs_total",
            "Total provisioning runs",
        ),
        &["result"], // "provisioned", or a ProvisioningError kind
    )
    .unwrap()
});

/// Provisioning run duration in seconds.
pub static PROVISIONING_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mailwright_provisioning_duration_seconds",
            "Duration of a provisioning run",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["result"],
    )
    .unwrap()
});

/// Unit group syncs total by result.
pub static GROUP_SYNCS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mailwright_group_syncs_total", "Total unit group syncs"),
        &["result"], // "linked", "not_found", "failed"
    )
    .unwrap()
});

// =============================================================================
// Address allocation
// =============================================================================

/// Principal lookups needed per address resolution.
pub static ADDRESS_PROBES: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "mailwright_address_probes",
            "Number of principal lookups per address resolution",
        )
        .buckets(vec![1.0, 2.0, 3.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
    )
    .unwrap()
});

// =============================================================================
// Group linking
// =============================================================================

/// Distribution list resolutions by which form matched.
pub static GROUP_RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mailwright_group_resolutions_total",
            "Distribution list resolutions",
        ),
        &["form"], // "primary", "lowercase", "not_found"
    )
    .unwrap()
});

/// Membership link attempts by outcome.
pub static MEMBERSHIP_LINKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mailwright_membership_links_total",
            "Group membership link attempts",
        ),
        &["outcome"], // "added", "already_member", "failed"
    )
    .unwrap()
});

// =============================================================================
// Directory
// =============================================================================

/// Failed token acquisitions.
pub static TOKEN_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mailwright_token_failures_total",
        "Failed directory token acquisitions",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Provisioning
        Box::new(PROVISIONING_RUNS.clone()),
        Box::new(PROVISIONING_DURATION.clone()),
        Box::new(GROUP_SYNCS.clone()),
        // Allocation
        Box::new(ADDRESS_PROBES.clone()),
        // Groups
        Box::new(GROUP_RESOLUTIONS.clone()),
        Box::new(MEMBERSHIP_LINKS.clone()),
        // Directory
        Box::new(TOKEN_FAILURES.clone()),
    ]
}
