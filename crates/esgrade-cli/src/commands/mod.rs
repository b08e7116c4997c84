pub mod policies;
pub mod run;
pub mod score;
pub mod validate;
