//! Concrete collaborators: outbound HTTP, script sandbox, operator
//! directory with presence, schedule/template catalogue, and the clock.

pub mod catalogue;
pub mod clock;
pub mod directory;
pub mod http;
pub mod script;

pub use catalogue::MemoryCatalogue;
pub use clock::SystemClock;
pub use directory::{OperatorDirectory, Presence};
pub use http::ReqwestFetch;
pub use script::{SandboxScript, ScriptError};
