use std::error::Error;
use std::fmt::{Display, Formatter, Result};
use std::path::{Path, PathBuf};

type Underlying = Box<dyn Error + Send + Sync>;

#[derive(Debug)]
pub struct SourceError {
    path: PathBuf,
    original_error: Underlying,
}

impl SourceError {
    pub fn new(path: &Path, original_error: impl Into<Underlying>) -> Self {
        SourceError {
            path: path.to_path_buf(),
            original_error: original_error.into(),
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "{}: {}", self.path.display(), self.original_error)
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.original_error)
    }
}
