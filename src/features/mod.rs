pub mod prescriptions;
pub mod videos;
