pub mod keywords;
pub mod run;
pub mod score;
pub mod stats;
pub mod tile;
