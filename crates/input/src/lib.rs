//! Input: platform key codes and pointer events mapped to game actions.
//!
//! # Invariants
//! - Hosts translate their native events into `Key`; nothing here depends
//!   on a windowing library.
//! - Gameplay reads actions and axes, never raw events.

pub mod action;
mod state;

pub use action::{Action, Key};
pub use state::InputState;

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}
