//! Hub services.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the hub's business logic over [`crate::state::HubState`]
//! so [`crate::hub::MemoryHub`] can stay focused on translating the client
//! traits into service calls.

pub mod board;
pub mod cursor;
pub mod object;
