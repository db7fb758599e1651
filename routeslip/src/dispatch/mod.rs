//! Routing messages along their slips.
//!
//! The dispatcher is the consumer of the cursor: it asks for the next stage,
//! resolves the name against a `StageRegistry`, runs the stage and repeats
//! until the cursor reports exhaustion. Unknown stage names are detected
//! here and nowhere else.

mod dispatcher;

pub use dispatcher::{Dispatcher, Message};
