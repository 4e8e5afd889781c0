use chrono::Utc;
use uuid::Uuid;

use crate::stored_object;

stored_object!(IndexChunk, "index_chunk", {
    index_id: String,
    document_id: String,
    file_name: String,
    content_type: String,
    chunk: String,
    embedding: Vec<f32>
});

impl IndexChunk {
    pub fn new(
        index_id: &str,
        document_id: &str,
        file_name: &str,
        content_type: &str,
        chunk: String,
        embedding: Vec<f32>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            index_id: index_id.to_string(),
            document_id: document_id.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            chunk,
            embedding,
        }
    }
}
