// SPDX-License-Identifier: GPL-3.0-only

//! Photo booth session logic
//!
//! - `state`: capture state machine types
//! - `coordinator`: the state machine driving preview, countdown and capture
//! - `session`: per-run record of choices, name and photo
//! - `catalog`: the closed set of selectable choices and their images

pub mod catalog;
pub mod coordinator;
pub mod session;
pub mod state;

pub use catalog::{ChoiceCatalog, ChoiceCategory};
pub use coordinator::CaptureCoordinator;
pub use session::SessionRecord;
pub use state::{CaptureState, CaptureStateKind, CoordinatorUpdate};
