mod identity;
mod memory;

pub use identity::{Consumption, IdentityStore, PgIdentityStore};
pub use memory::MemoryIdentityStore;
