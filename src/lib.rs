//! Reference sync hub and headless demo for the collaborative canvas.
//!
//! [`hub::MemoryHub`] stands in for the external sync service in process:
//! boards and notes with last-write-wins arbitration, snapshot push to every
//! subscriber, and presence rooms. [`demo::run`] mounts two engines against it
//! and walks them through a short editing session.

pub mod config;
pub mod demo;
pub mod hub;
pub mod services;
pub mod state;
