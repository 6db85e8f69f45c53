pub mod invoke;
