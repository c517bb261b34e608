//! Command implementations.

mod parse;
mod show;
mod watch;

pub use parse::ParseCommand;
pub use show::ShowCommand;
pub use watch::WatchCommand;
