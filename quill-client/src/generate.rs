//! Synchronous generation endpoint

use crate::OrchestratorClient;
use crate::error::Result;
use quill_core::domain::document::ContentDocument;
use quill_core::domain::request::GenerationRequest;

impl OrchestratorClient {
    /// Run the whole pipeline and wait for the document
    ///
    /// Nothing is persisted; the request blocks until every stage finished.
    pub async fn generate_sync(&self, request: &GenerationRequest) -> Result<ContentDocument> {
        let url = format!("{}/generate", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;

        self.handle_response(response).await
    }
}
