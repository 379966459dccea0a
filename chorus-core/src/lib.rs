//! The session coordination core: rooms, host authority, queue semantics,
//! drift correction, transport session lifecycles and the local mixing graph.
//!
//! Nothing in here touches the network.

mod config;
mod drift;
mod errors;
mod mixer;
mod playback;
mod registry;
mod resolver;
mod room;
mod track;
mod transport;
mod util;

pub mod implementors;
pub use config::*;
pub use drift::*;
pub use errors::*;
pub use mixer::*;
pub use playback::*;
pub use registry::*;
pub use resolver::*;
pub use room::*;
pub use track::*;
pub use transport::*;
pub use util::*;
