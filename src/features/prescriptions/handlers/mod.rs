mod prescription_handler;

pub use prescription_handler::*;
