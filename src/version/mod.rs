pub mod semverish;

pub use semverish::{compare, major, normalize, prerelease, sort_descending};
