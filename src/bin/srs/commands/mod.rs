pub mod due;
pub mod serve;
