pub mod clock;
pub mod search;
