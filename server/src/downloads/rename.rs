use std::fmt;
use std::path::{Path, PathBuf};

/// Decides where a freshly downloaded file goes and what it is called.
/// `Display` names the target in logs and error messages.
pub trait RenameStrategy: fmt::Display + Send + Sync {
    fn folder(&self) -> &Path;

    fn new_filename(&self, old_filename: &str) -> String;

    fn destination(&self, old_filename: &str) -> PathBuf {
        self.folder().join(self.new_filename(old_filename))
    }
}

/// Always the same name, e.g. `soa.pdf`.
#[derive(Debug, Clone)]
pub struct FixedName {
    folder: PathBuf,
    filename: String,
}

impl FixedName {
    pub fn new(folder: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            filename: filename.into(),
        }
    }
}

impl RenameStrategy for FixedName {
    fn folder(&self) -> &Path {
        &self.folder
    }

    fn new_filename(&self, _old_filename: &str) -> String {
        self.filename.clone()
    }
}

impl fmt::Display for FixedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename)
    }
}

/// Keeps the portal's name and appends `-{suffix}-f1` before the extension.
#[derive(Debug, Clone)]
pub struct AddSuffix {
    folder: PathBuf,
    suffix: String,
}

impl AddSuffix {
    pub fn new(folder: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            suffix: suffix.into(),
        }
    }
}

impl RenameStrategy for AddSuffix {
    fn folder(&self) -> &Path {
        &self.folder
    }

    fn new_filename(&self, old_filename: &str) -> String {
        let old = Path::new(old_filename);
        let stem = old
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match old.extension() {
            Some(ext) => format!("{}-{}-f1.{}", stem, self.suffix, ext.to_string_lossy()),
            None => format!("{}-{}-f1", stem, self.suffix),
        }
    }
}

impl fmt::Display for AddSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "archivo con sufijo {}", self.suffix)
    }
}
