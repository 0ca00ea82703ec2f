pub mod approval;
pub mod line_item;
pub mod product;
pub mod submission;
