mod prescription_service;
mod prescription_store;

pub use prescription_service::PrescriptionService;
pub use prescription_store::PrescriptionStore;
