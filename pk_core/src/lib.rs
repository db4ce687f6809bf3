pub mod classify;
pub mod error;
pub mod metadata;
pub mod progress;
pub mod spec;

pub use classify::{LineEvent, SizeUnit, classify};
pub use error::Error;
pub use metadata::{PIPKIN_SPEC_VERSION, PackageMetadata, VenvMetadata, freeze_document};
pub use progress::{Action, InstallTracker, ProgressSink};
pub use spec::package_name_from_spec;
