pub mod catalogue;
pub mod config;
pub mod error;
pub mod event;
pub mod session;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{FlowdeskError, Result};
pub use event::{DeskEvent, EventBus};
pub use session::{Closer, NotAllowed, Session, SessionStatus};
pub use types::*;
