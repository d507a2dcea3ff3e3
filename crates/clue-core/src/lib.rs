#![deny(warnings)]
pub mod belief;
pub mod error;
pub mod game;
pub mod model;

pub use error::{ClueError, Conflict};

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "clue-solver"
    }

    pub const fn codename() -> &'static str {
        "Case File"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
