#![doc = "apkwatch-core: release diffing and delivery pipeline for apkwatch."]

//! This crate holds the data model, the trait seams and the pipeline that turns an
//! upstream release listing plus a version ledger into ordered, exactly-recorded
//! deliveries on an output channel.
//!
//! Channel transports and CLI glue live in the `apkwatch` binary crate.
//!
//! # Usage
//! Build a [`deliver::Relay`] from concrete collaborators and hand it to
//! [`synchronise::synchronise`] together with a [`config::RelayConfig`].

pub mod apkmirror;
pub mod config;
pub mod contract;
pub mod deliver;
pub mod diff;
pub mod digest;
pub mod error;
pub mod fetch;
pub mod ledger;
pub mod listing;
pub mod resolve;
pub mod synchronise;
