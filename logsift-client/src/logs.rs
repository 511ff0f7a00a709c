//! Log retrieval endpoints

use crate::LogSourceClient;
use crate::error::Result;
use logsift_core::dto::log::LogChunk;

impl LogSourceClient {
    /// Fetch the last `lines` lines of a job's log
    ///
    /// This is a single bounded request regardless of the true log size.
    ///
    /// # Arguments
    /// * `build_id` - The build/pipeline id within the source system
    /// * `job_id` - The job id within the build
    /// * `lines` - Maximum number of trailing lines to return
    ///
    /// # Returns
    /// A log chunk covering at most the last `lines` lines of the source
    pub async fn fetch_tail(&self, build_id: &str, job_id: &str, lines: usize) -> Result<LogChunk> {
        let url = format!(
            "{}/api/builds/{}/jobs/{}/log/tail",
            self.base_url, build_id, job_id
        );
        tracing::debug!(build_id, job_id, lines, "requesting log tail");
        let response = self
            .client
            .get(&url)
            .query(&[("lines", lines)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Fetch `limit` lines of a job's log starting at `offset`
    ///
    /// Used by the streaming phase to walk a log front to back in bounded
    /// steps. `offset` is the 0-based line index to start from.
    ///
    /// # Arguments
    /// * `build_id` - The build/pipeline id within the source system
    /// * `job_id` - The job id within the build
    /// * `offset` - 0-based line index of the first line to return
    /// * `limit` - Maximum number of lines to return
    ///
    /// # Returns
    /// A log chunk with `eof` set when the end of the source was reached
    pub async fn fetch_chunk(
        &self,
        build_id: &str,
        job_id: &str,
        offset: u64,
        limit: usize,
    ) -> Result<LogChunk> {
        let url = format!(
            "{}/api/builds/{}/jobs/{}/log",
            self.base_url, build_id, job_id
        );
        tracing::debug!(build_id, job_id, offset, limit, "requesting log chunk");
        let response = self
            .client
            .get(&url)
            .query(&[("offset", offset)])
            .query(&[("limit", limit as u64)])
            .send()
            .await?;

        self.handle_response(response).await
    }
}
