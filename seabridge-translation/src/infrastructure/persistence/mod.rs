pub mod memory;
pub mod postgres;

pub use memory::InMemoryJobStore;
pub use postgres::PostgresJobStore;
