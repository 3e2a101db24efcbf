//! Adapters for the domain ports: storage backends and payment gateways.

pub mod gateways;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
