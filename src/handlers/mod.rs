pub mod metadata;
pub mod process;
pub mod system;

pub use metadata::get_metadata;
pub use process::process_files;
pub use system::{health_check, index};
