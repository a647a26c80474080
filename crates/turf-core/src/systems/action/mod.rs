//! Action Systems
//!
//! Creation and validation, dice rolls with enemy penalties, and
//! application of resolved outcomes.

pub mod create;
pub mod resolve;
pub mod roll;

pub use create::{
    assign_task, clear_task, create_action, create_action_for_task, ActionParams,
};
pub use resolve::{apply_action_outcome, ActionEffect};
pub use roll::{roll_for_action, roll_with_context, secondary_monitoring_roll, RollContext, RollResult};
