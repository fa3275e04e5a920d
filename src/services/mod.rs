pub mod ai;
pub mod assessment;
pub mod keywords;
pub mod summary;
