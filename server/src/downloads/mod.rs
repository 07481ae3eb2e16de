pub mod rename;
pub mod starter;
pub mod watcher;

pub use rename::{AddSuffix, FixedName, RenameStrategy};
pub use starter::{ClickDownloadStarter, DownloadStarter, ErrorProbe, ScriptDownloadStarter};
pub use watcher::{FileTransferWatcher, WatcherTiming};
