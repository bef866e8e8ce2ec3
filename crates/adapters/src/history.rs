use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use quarry_core::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: String,
    pub query: String,
    pub executed_at_unix_ms: u128,
}

/// Queries executed per connection, oldest first. Ids are `h1`, `h2`, ...
/// and unique within one connection.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: HashMap<ConnectionId, Vec<HistoryEntry>>,
}

impl HistoryLog {
    pub fn record(&mut self, connection: &ConnectionId, query: &str) -> &HistoryEntry {
        let entries = self.entries.entry(connection.clone()).or_default();
        entries.push(HistoryEntry {
            id: format!("h{}", entries.len() + 1),
            query: query.to_string(),
            executed_at_unix_ms: unix_timestamp_millis(),
        });
        &entries[entries.len() - 1]
    }

    #[must_use]
    pub fn entries(&self, connection: &ConnectionId) -> &[HistoryEntry] {
        self.entries
            .get(connection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn find(&self, connection: &ConnectionId, history_id: &str) -> Option<&HistoryEntry> {
        self.entries(connection)
            .iter()
            .find(|entry| entry.id == history_id)
    }
}

fn unix_timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[cfg(test)]
mod tests {
    use quarry_core::ConnectionId;

    use super::HistoryLog;

    #[test]
    fn ids_are_sequential_per_connection() {
        let mut log = HistoryLog::default();
        let local = ConnectionId::from("localmysql");
        let other = ConnectionId::from("othermysql");

        assert_eq!(log.record(&local, "select 1").id, "h1");
        assert_eq!(log.record(&local, "select 2").id, "h2");
        assert_eq!(log.record(&other, "select 3").id, "h1");

        assert_eq!(
            log.find(&local, "h2").map(|entry| entry.query.as_str()),
            Some("select 2")
        );
        assert!(log.find(&other, "h2").is_none());
        assert!(log.entries(&ConnectionId::from("unknown")).is_empty());
    }
}
