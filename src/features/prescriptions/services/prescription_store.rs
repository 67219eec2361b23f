use crate::features::prescriptions::models::Prescription;
use crate::modules::storage::{RecordStore, StoredRecord};

/// Process-wide prescription records, mirrored to a persistence backend
pub type PrescriptionStore = RecordStore<Prescription>;

impl StoredRecord for Prescription {
    const KIND: &'static str = "Prescription";

    fn id(&self) -> &str {
        &self.id
    }

    fn restore_identity(&mut self, original: &Self) {
        self.id = original.id.clone();
    }
}
