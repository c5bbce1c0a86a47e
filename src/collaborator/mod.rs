pub mod jlecmd;
pub mod locator;
pub mod table;

use std::path::Path;

use crate::error::Result;

pub use jlecmd::JleCmdParser;
pub use locator::{CollaboratorLocator, LocatorStep};
pub use table::{RawRow, RawTable};

/// Turns a directory of JumpList files into raw tabular rows.
pub trait ArtifactParser: Send + Sync {
    fn parse_directory(&self, directory: &Path) -> Result<RawTable>;
}
