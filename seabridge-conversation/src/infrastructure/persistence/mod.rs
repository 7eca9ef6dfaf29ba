pub mod memory;
pub mod postgres;

pub use memory::InMemoryMessageStore;
pub use postgres::PostgresMessageStore;
