pub mod path_filter;
pub mod path_validator;

pub use path_filter::PathFilter;
pub use path_validator::PathValidator;
