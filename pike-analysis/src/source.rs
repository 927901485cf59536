use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u32);

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: SourceId,
    pub path: PathBuf,
    pub contents: String,
}

impl SourceFile {
    pub fn new(id: SourceId, path: PathBuf, contents: String) -> Self {
        Self { id, path, contents }
    }

    /// The file name used in diagnostic positions.
    pub fn display_name(&self) -> String {
        self.path.display().to_string()
    }

    /// Raw source split on `\n`, the line table used for column recovery.
    pub fn lines(&self) -> Vec<&str> {
        self.contents.split('\n').collect()
    }
}
