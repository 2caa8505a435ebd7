pub mod memory;
pub mod rest;
pub mod traits;

pub use memory::{MemoryRepository, Op};
pub use rest::RestRepository;
pub use traits::{AuthRepository, CultureRepository, JobRepository, MediaRepository};
