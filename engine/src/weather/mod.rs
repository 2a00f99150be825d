//! Airport weather: METAR grammar, decoding into what the board shows, and a cache in front
//! of the fetch.
//!

pub use cache::*;
pub use decode::*;
pub use metar::*;
pub use source::*;

mod cache;
mod decode;
mod metar;
mod source;
