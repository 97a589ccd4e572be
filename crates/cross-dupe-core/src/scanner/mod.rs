pub mod record;
pub mod walk;

pub use record::{EntryKind, FileRecord, ScannedDirectory, ROOT_FOLDER};
pub use walk::{scan_directory, ScanOptions};
