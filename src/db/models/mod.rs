//! Database models split into domain-specific modules.

pub mod attendance;
pub mod leave;
pub mod message;
pub mod notification;
pub mod org;
pub mod settings;
pub mod user;

pub use attendance::*;
pub use leave::*;
pub use message::*;
pub use notification::*;
pub use org::*;
pub use settings::*;
pub use user::*;
