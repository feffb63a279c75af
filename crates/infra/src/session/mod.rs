//! Session storage adapters

pub mod memory;

pub use memory::InMemorySessionStore;
