//! Version discovery and release-kind bumping.

pub mod bump;
pub mod properties;

pub use bump::{ReleaseKind, calculate_next_version};
pub use properties::{parse_version, read_current_version, version_from_properties};
