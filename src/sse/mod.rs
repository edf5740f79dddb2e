//! SSE (Server-Sent Events) scenario stream parsing
//!
//! Parses the SSE format used by the scenario generation backend.
//! The backend's framing is a restricted dialect of SSE:
//! - `event: <name>` - names the next data line (one name per data line)
//! - `data: <payload>` - one logical payload per line
//! - Blank lines and anything else are ignored
//!
//! # Module structure
//! - `events` - Event type definitions (StreamEvent, Choice, RawFrame)
//! - `demux` - Chunk demultiplexer (FrameDemux)
//! - `classifier` - Frame classification into typed events
//! - `payloads` - Internal payload deserialization structs

mod classifier;
mod demux;
mod events;
mod payloads;

// Re-export public types
pub use classifier::{classify, DONE_SENTINEL};
pub use demux::FrameDemux;
pub use events::{Choice, Feedback, RawFrame, StreamEvent, SurvivalRate};
