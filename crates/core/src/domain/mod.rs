pub mod directory;
pub mod entity;
pub mod rule;
