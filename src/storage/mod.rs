pub mod memory;
pub mod postgres;
pub mod table;

pub use memory::MemoryStore;
pub use postgres::{PgFactory, PgStore};
pub use table::{Table, TableSchema};
