pub mod derived;
pub mod extract;
pub mod histogram;
pub mod kd_tree;
pub mod range;
pub mod scale;
pub mod statistics;
pub mod surface;
pub mod worker;
