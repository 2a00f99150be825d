//! Library part of the `deplistctl` utility.
//!
//! The engine does the actual work, this is the command-line composition around it.
//!

pub use cli::*;
pub use cmds::*;

mod cli;
mod cmds;
