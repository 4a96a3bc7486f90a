//! Product ingestion and lookup

pub mod ports;
pub mod service;

pub use ports::ProductRepository;
pub use service::ProductService;
