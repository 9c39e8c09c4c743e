//! Session controller: the state behind one editing session.
//!
//! A [`Session`] owns the source image, the crop and resize choices, the prompt,
//! the last edit result and its locally adjusted version. Remote edits move the
//! [`RequestStatus`] through `Generating`/`Enhancing` and back; adjustments are
//! recomputed whenever the edit result or the parameters change, and results of
//! superseded computations are dropped.

mod adjust;
mod controller;
mod status;
mod token;

pub use adjust::{AdjustmentJob, AdjustmentOutcome, Adjustments};
pub use controller::{Download, PendingEdit, Session, DOWNLOAD_STEM};
pub use status::{EditKind, RequestStatus};
pub use token::Token;
