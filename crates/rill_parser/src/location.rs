use std::fmt::Display;
use std::rc::Rc;

/// A position in the source code: file, 1-based line, 1-based column.
///
/// The file name is shared between every token of a source unit, so it is
/// kept behind an `Rc` and cloning a location is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcLoc {
    pub file: Rc<str>,
    pub line: u32,
    pub col: u32,
}

impl SrcLoc {
    pub fn new(file: Rc<str>, line: u32, col: u32) -> SrcLoc {
        SrcLoc { file, line, col }
    }
}

impl Display for SrcLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}:", self.file, self.line, self.col)
    }
}
