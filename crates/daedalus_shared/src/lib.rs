//! # Daedalus Shared
//!
//! Types shared between the world generator and whatever hosts it.
//!
//! ## Contents
//!
//! - [`math`]: axis-aligned and oriented boxes on `f64` vectors
//! - [`coords`]: chunk and biome-region offsets
//! - [`events`]: the closed world event set and its pub/sub bus

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod coords;
pub mod events;
pub mod math;

pub use coords::{BiomeRegionOffset, ChunkOffset};
pub use events::{EventBus, EventKind, EventReceiver, WorldEvent};
pub use math::{Aabb, Obb};
