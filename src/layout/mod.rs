//! Layout analysis: page fingerprinting and style-group clustering.
//!
//! Receipts from the same issuer share a printed form. This module groups a
//! batch of scanned pages by that form so one field template can be applied
//! to every page in a group.

pub mod cluster;
pub mod fingerprint;

pub use cluster::{cluster_pages, CLUSTER_DISTANCE_THRESHOLD};
pub use fingerprint::{fingerprint, ncc_score, FINGERPRINT_HEIGHT, FINGERPRINT_WIDTH};
