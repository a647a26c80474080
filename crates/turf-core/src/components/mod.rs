//! Entity Components
//!
//! Records for districts, factions, pieces, actions, conflicts and rumors.

pub mod action;
pub mod capability;
pub mod conflict;
pub mod district;
pub mod faction;
pub mod piece;
pub mod rumor;

pub use action::*;
pub use capability::*;
pub use conflict::*;
pub use district::*;
pub use faction::*;
pub use piece::*;
pub use rumor::*;
