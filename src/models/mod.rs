pub use member::*;

pub mod member;
