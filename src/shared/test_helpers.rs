use std::path::Path;

use fake::faker::lorem::en::{Sentence, Words};
use fake::Fake;
use uuid::Uuid;

use crate::features::prescriptions::models::Prescription;
use crate::features::videos::models::VideoRecord;

/// Video record with a random id and lorem title. The file it names does not
/// exist until written with [`write_video_file`].
pub fn fake_video_record() -> VideoRecord {
    let id = Uuid::new_v4().to_string();
    let title: String = Sentence(2..5).fake();
    let description: String = Sentence(5..10).fake();
    let file_name = format!("{}.webm", id);
    VideoRecord::new(id, title, description, file_name, Vec::new())
}

/// Write `size` bytes with a repeating pattern so range reads can be checked
/// against exact offsets.
pub fn write_video_file(dir: &Path, name: &str, size: usize) {
    let bytes: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    std::fs::write(dir.join(name), bytes).unwrap();
}

pub fn fake_prescription(patient_id: Option<i64>) -> Prescription {
    let words: Vec<String> = Words(1..3).fake();
    Prescription::new(
        patient_id,
        format!("Patient {}", words.join(" ")),
        None,
        vec![format!("{} 10mg", words.join("-"))],
    )
}
