//! Collaborative sticky-note canvas engine.
//!
//! This crate owns the client side of a shared whiteboard: translating raw
//! pointer and keyboard input into note mutations, maintaining camera state
//! for pan/zoom, mirroring the board's notes optimistically while the sync
//! service catches up, and tracking peer cursors in the board's presence
//! room. The host layer wires DOM events to [`engine::EngineCore`], applies
//! the returned [`engine::Action`]s, and runs the futures produced by
//! [`session::mount`].
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Interaction state machine ([`engine::EngineCore`]) and the canvas-bound [`engine::Engine`] |
//! | [`doc`] | Board records and the optimistic note store |
//! | [`outbox`] | Mutation queue and the forwarder that drains it into the sync service |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`input`] | Input event types and gesture states |
//! | [`hit`] | Hit-testing against notes |
//! | [`presence`] | Live-cursor presence channel |
//! | [`color`] | Deterministic per-user cursor colors |
//! | [`sync`] | Interfaces of the external sync collaborator |
//! | [`session`] | Mounting a board: subscription, presence and forwarding tasks |
//! | [`render`] | Scene building and 2D-context drawing |
//! | [`config`] | Tunables with environment overrides |
//! | [`consts`] | Shared numeric constants (zoom limits, note defaults, etc.) |

pub mod camera;
pub mod color;
pub mod config;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod error;
pub mod hit;
pub mod input;
pub mod outbox;
pub mod presence;
pub mod render;
pub mod session;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_helpers;
