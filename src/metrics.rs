//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{Counter, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Auth Metrics
    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postboard_logins_total", "Total number of login attempts"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref PRINCIPALS_RESOLVED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postboard_principals_resolved_total", "Principals resolved by the authentication middleware"),
        &["kind"]
    ).expect("metric can be created");
    pub static ref LOGOUTS_TOTAL: IntCounter = IntCounter::new(
        "postboard_logouts_total",
        "Total number of logouts that revoked sessions"
    ).expect("metric can be created");
    pub static ref REGISTRATIONS_TOTAL: IntCounter = IntCounter::new(
        "postboard_registrations_total",
        "Total number of registered users"
    ).expect("metric can be created");

    // Content Metrics
    pub static ref POSTS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "postboard_posts_created_total",
        "Total number of posts created"
    ).expect("metric can be created");
    pub static ref MESSAGES_CREATED_TOTAL: IntCounter = IntCounter::new(
        "postboard_messages_created_total",
        "Total number of messages created"
    ).expect("metric can be created");

    // Storage Metrics
    pub static ref IMAGE_UPLOADS_TOTAL: IntCounter = IntCounter::new(
        "postboard_image_uploads_total",
        "Total number of image uploads"
    ).expect("metric can be created");
    pub static ref IMAGE_BYTES_UPLOADED: Counter = Counter::new(
        "postboard_image_bytes_uploaded_total",
        "Total bytes of images uploaded"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postboard_errors_total", "Total number of error responses"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Call once at startup; registering twice fails.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(LOGINS_TOTAL.clone()))
        .expect("LOGINS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(PRINCIPALS_RESOLVED_TOTAL.clone()))
        .expect("PRINCIPALS_RESOLVED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(LOGOUTS_TOTAL.clone()))
        .expect("LOGOUTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(REGISTRATIONS_TOTAL.clone()))
        .expect("REGISTRATIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(POSTS_CREATED_TOTAL.clone()))
        .expect("POSTS_CREATED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(MESSAGES_CREATED_TOTAL.clone()))
        .expect("MESSAGES_CREATED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(IMAGE_UPLOADS_TOTAL.clone()))
        .expect("IMAGE_UPLOADS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(IMAGE_BYTES_UPLOADED.clone()))
        .expect("IMAGE_BYTES_UPLOADED can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
