//! # Metrics Collection
//!
//! Counters for credential resolution and connection retries, recorded
//! through the `metrics` facade. credpool installs no exporter; an embedding
//! application that installs a recorder sees these series.

use metrics::{counter, describe_counter, Unit};

pub const CACHE_HITS_TOTAL: &str = "credpool_cache_hits_total";
pub const CACHE_MISSES_TOTAL: &str = "credpool_cache_misses_total";
pub const SECRET_FETCHES_TOTAL: &str = "credpool_secret_fetches_total";
pub const CONNECT_RETRIES_TOTAL: &str = "credpool_connect_retries_total";
pub const CONNECT_FAILURES_TOTAL: &str = "credpool_connect_failures_total";

/// Register descriptions for every credpool series with the installed recorder
pub fn describe_metrics() {
    describe_counter!(CACHE_HITS_TOTAL, Unit::Count, "Credential cache lookups served from cache");
    describe_counter!(
        CACHE_MISSES_TOTAL,
        Unit::Count,
        "Credential cache lookups that had to fetch from the secret store"
    );
    describe_counter!(SECRET_FETCHES_TOTAL, Unit::Count, "Secret store fetches by outcome");
    describe_counter!(
        CONNECT_RETRIES_TOTAL,
        Unit::Count,
        "Connection attempts retried after invalidating cached credentials"
    );
    describe_counter!(
        CONNECT_FAILURES_TOTAL,
        Unit::Count,
        "Connection requests that failed after all permitted attempts"
    );
}

pub fn record_cache_hit() {
    counter!(CACHE_HITS_TOTAL).increment(1);
}

pub fn record_cache_miss() {
    counter!(CACHE_MISSES_TOTAL).increment(1);
}

/// Record a secret store fetch
pub fn record_secret_fetch(backend: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    let labels = [("backend", backend.to_string()), ("status", status.to_string())];
    counter!(SECRET_FETCHES_TOTAL, &labels).increment(1);
}

pub fn record_connect_retry(environment: &str) {
    let labels = [("environment", environment.to_string())];
    counter!(CONNECT_RETRIES_TOTAL, &labels).increment(1);
}

/// Record a connection request that gave up
pub fn record_connect_failure(environment: &str, kind: &str) {
    let labels = [("environment", environment.to_string()), ("kind", kind.to_string())];
    counter!(CONNECT_FAILURES_TOTAL, &labels).increment(1);
}
