pub mod folder_scanner;

pub use folder_scanner::{FolderScanner, ScanConfig};
