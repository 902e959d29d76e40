//! ClubTrack - Membership billing backend
//!
//! This crate processes subscription lifecycle webhooks from the billing
//! provider and keeps member account status consistent under replayed,
//! reordered, and forged deliveries.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
