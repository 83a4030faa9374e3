// Session core: typed state, the reducer that transitions it, and the
// controller that runs the reducer's effects against the backend.
// At most one mutating request (generate, modify, revert) is in flight at a time.

pub mod controller;
pub mod history;
pub mod reducer;
pub mod state;
pub mod transcript;

pub use controller::Controller;
pub use reducer::Action;
