pub mod apportion;
pub mod study;
