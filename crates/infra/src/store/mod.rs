//! Product store adapters

pub mod memory;

pub use memory::InMemoryProductRepository;
