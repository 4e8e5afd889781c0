use chrono::Utc;
use uuid::Uuid;

use crate::stored_object;

stored_object!(Document, "document", {
    file_name: String,
    content_type: String,
    index_handle: String
});

impl Document {
    /// The identifier is generated before the index build so it can be
    /// attached to the index metadata; pass it back in here unchanged.
    pub fn new(id: String, file_name: String, content_type: String, index_handle: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            file_name,
            content_type,
            index_handle,
        }
    }

    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::SurrealDbClient;

    #[test]
    fn new_document_carries_metadata() {
        let id = Document::generate_id();
        let document = Document::new(
            id.clone(),
            "notes.txt".to_string(),
            "text/plain".to_string(),
            "index-123".to_string(),
        );

        assert_eq!(document.id, id);
        assert_eq!(document.file_name, "notes.txt");
        assert_eq!(document.content_type, "text/plain");
        assert_eq!(document.index_handle, "index-123");
    }

    #[tokio::test]
    async fn stored_document_round_trips() {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");

        let document = Document::new(
            Document::generate_id(),
            "sky.txt".to_string(),
            "text/plain".to_string(),
            "index-abc".to_string(),
        );

        db.store_item(document.clone())
            .await
            .expect("Failed to store document");

        let fetched = db
            .get_item::<Document>(&document.id)
            .await
            .expect("Failed to fetch document")
            .expect("Document missing after store");

        assert_eq!(fetched.file_name, document.file_name);
        assert_eq!(fetched.content_type, document.content_type);
        assert_eq!(fetched.index_handle, document.index_handle);
    }
}
