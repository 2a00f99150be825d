pub use decode::*;
pub use replay::*;
pub use weather::*;

mod decode;
mod replay;
mod weather;
