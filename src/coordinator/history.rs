//! Paged history replay

use tracing::debug;

use crate::config::HistoryConfig;
use crate::error::Result;
use crate::session::LogEntry;
use crate::transport::{AgentTransport, PageRequest};

/// Pull a session's messages page by page, oldest first.
///
/// Stops when the server reports no more pages or after `max_pages`.
/// Internal and empty messages are skipped.
pub(crate) async fn fetch_history(
    transport: &dyn AgentTransport,
    session_id: &str,
    config: &HistoryConfig,
) -> Result<Vec<LogEntry>> {
    let mut entries = Vec::new();
    let mut offset = 0;

    for page_index in 0..config.max_pages {
        let page = transport
            .fetch_session_messages(
                session_id,
                PageRequest {
                    offset,
                    limit: config.page_size,
                },
            )
            .await?;

        let fetched = page.messages.len();
        offset += fetched;
        entries.extend(
            page.messages
                .into_iter()
                .filter_map(|m| m.into_log_entry(session_id)),
        );

        if !page.has_more || fetched == 0 {
            break;
        }
        if page_index + 1 == config.max_pages {
            debug!(session = session_id, pages = config.max_pages, "history truncated");
        }
    }

    Ok(entries)
}
