//! Fakes for the collaborator traits, plus canned flows.
//!
//! Nothing here touches the network or the real clock.

pub mod fakes;
pub mod fixtures;

pub use fakes::{FailingScript, FixedClock, ScriptedHttp, StaticCatalogue, StaticDirectory};
pub use fixtures::{temp_file, vip_flow_json};
