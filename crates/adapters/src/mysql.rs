use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Opts, Pool, Row, Value};
use quarry_core::config::ResultSettings;
use quarry_core::layout::{encode_layout, LayoutKind, LayoutNode};
use quarry_core::{
    BackendError, ConnectionId, ExecutionBackend, Generation, ResultSink, SaveFormat,
};

use crate::export::export_table;
use crate::history::HistoryLog;
use crate::result_store::{PagedResult, ResultTable};

pub const MYSQL_KIND: &str = "mysql";

#[derive(Debug, Default)]
struct BackendState {
    pools: HashMap<ConnectionId, Pool>,
    results: HashMap<ConnectionId, PagedResult>,
    history: HistoryLog,
    latest: HashMap<ConnectionId, Generation>,
    sink: Option<ResultSink>,
}

impl BackendState {
    fn pool(&self, id: &ConnectionId) -> Result<Pool, BackendError> {
        self.pools
            .get(id)
            .cloned()
            .ok_or_else(|| BackendError::new(format!("connection `{id}` is not registered")))
    }

    /// Stores or clears the result of a finished query and returns the lines
    /// to show. Only the latest command issued for a connection may touch its
    /// stored result.
    fn finish_query(
        &mut self,
        id: ConnectionId,
        generation: Generation,
        outcome: Result<ResultTable, String>,
        page_size: usize,
    ) -> Vec<String> {
        let current = self.latest.get(&id) == Some(&generation);
        match outcome {
            Ok(table) => {
                let result = PagedResult::new(table, page_size);
                let lines = result.render_page(0);
                if current {
                    self.results.insert(id, result);
                } else {
                    tracing::debug!(connection = %id, %generation, "keeping result of a newer command");
                }
                lines
            }
            Err(error) => {
                tracing::warn!(connection = %id, %error, "query failed");
                if current {
                    self.results.remove(&id);
                }
                vec![format!("error: {error}")]
            }
        }
    }
}

/// Execution backend for MySQL connections.
///
/// Queries run on spawned tokio tasks and push their first page through the
/// results sink; paging and saving work on the last result stored per
/// connection.
#[derive(Debug, Clone)]
pub struct MysqlExecutionBackend {
    state: Arc<Mutex<BackendState>>,
    settings: ResultSettings,
}

impl Default for MysqlExecutionBackend {
    fn default() -> Self {
        Self::new(ResultSettings::default())
    }
}

impl MysqlExecutionBackend {
    #[must_use]
    pub fn new(settings: ResultSettings) -> Self {
        Self {
            state: Arc::new(Mutex::new(BackendState::default())),
            settings,
        }
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        lock(&self.state)
    }

    fn spawn_query(&self, id: ConnectionId, pool: Pool, query: String, generation: Generation) {
        let state = Arc::clone(&self.state);
        let settings = self.settings.clone();

        tokio::spawn(async move {
            let outcome = fetch_table(&pool, &query, settings.row_limit)
                .await
                .map_err(|error| error.to_string());
            let lines = lock(&state).finish_query(id, generation, outcome, settings.page_size);
            deliver(&state, generation, lines);
        });
    }

    #[cfg(test)]
    fn store_result(&self, id: &ConnectionId, table: ResultTable) {
        let result = PagedResult::new(table, self.settings.page_size);
        self.state().results.insert(id.clone(), result);
    }
}

#[async_trait]
impl ExecutionBackend for MysqlExecutionBackend {
    async fn register_connection(
        &self,
        id: &ConnectionId,
        url: &str,
        kind: &str,
    ) -> Result<(), BackendError> {
        if !kind.trim().eq_ignore_ascii_case(MYSQL_KIND) {
            return Err(BackendError::new(format!(
                "unsupported connection kind `{kind}` for `{id}`"
            )));
        }

        let opts = Opts::from_url(url.trim()).map_err(|error| {
            BackendError::new(format!("invalid url for `{id}`: {error}"))
        })?;
        self.state().pools.insert(id.clone(), Pool::new(opts));
        Ok(())
    }

    async fn execute(
        &self,
        id: &ConnectionId,
        query: &str,
        generation: Generation,
    ) -> Result<(), BackendError> {
        let pool = {
            let mut state = self.state();
            let pool = state.pool(id)?;
            state.history.record(id, query);
            state.latest.insert(id.clone(), generation);
            pool
        };

        self.spawn_query(id.clone(), pool, query.to_string(), generation);
        Ok(())
    }

    async fn page(
        &self,
        id: &ConnectionId,
        requested: i64,
        generation: Generation,
    ) -> Result<i64, BackendError> {
        let (index, lines) = {
            let state = self.state();
            let result = state
                .results
                .get(id)
                .ok_or_else(|| BackendError::new(format!("no result to page for `{id}`")))?;
            let index = result.clamp(requested);
            (index, result.render_page(index))
        };

        deliver(&self.state, generation, lines);
        Ok(i64::try_from(index).unwrap_or(i64::MAX))
    }

    async fn history(
        &self,
        id: &ConnectionId,
        history_id: &str,
        generation: Generation,
    ) -> Result<(), BackendError> {
        let (pool, query) = {
            let mut state = self.state();
            let query = state
                .history
                .find(id, history_id)
                .map(|entry| entry.query.clone())
                .ok_or_else(|| {
                    BackendError::new(format!("unknown history entry `{history_id}` for `{id}`"))
                })?;
            let pool = state.pool(id)?;
            state.latest.insert(id.clone(), generation);
            (pool, query)
        };

        self.spawn_query(id.clone(), pool, query, generation);
        Ok(())
    }

    async fn layout(&self, id: &ConnectionId) -> Result<String, BackendError> {
        let pool = self.state().pool(id)?;
        let mut nodes = fetch_schema_nodes(&pool).await.map_err(to_backend_error)?;

        let history = self
            .state()
            .history
            .entries(id)
            .iter()
            .map(|entry| LayoutNode::new(entry.id.clone(), LayoutKind::History))
            .collect::<Vec<_>>();
        nodes.push(LayoutNode::new("history", LayoutKind::Group).with_children(history));

        encode_layout(&nodes).map_err(|error| BackendError::new(error.to_string()))
    }

    async fn save(
        &self,
        id: &ConnectionId,
        format: SaveFormat,
        destination: &Path,
    ) -> Result<(), BackendError> {
        let table = self
            .state()
            .results
            .get(id)
            .map(|result| result.table().clone())
            .ok_or_else(|| BackendError::new(format!("no result to save for `{id}`")))?;

        let written = export_table(destination, format, &table)
            .map_err(|error| BackendError::new(error.to_string()))?;
        tracing::info!(connection = %id, %format, rows = written, path = %destination.display(), "saved result");
        Ok(())
    }

    async fn set_results_sink(&self, sink: ResultSink) -> Result<(), BackendError> {
        self.state().sink = Some(sink);
        Ok(())
    }

    async fn close_results(&self) -> Result<(), BackendError> {
        self.state().sink = None;
        Ok(())
    }
}

fn lock(state: &Mutex<BackendState>) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn deliver(state: &Mutex<BackendState>, generation: Generation, lines: Vec<String>) {
    let sink = lock(state).sink.clone();
    match sink {
        Some(sink) => {
            if !sink.deliver(generation, lines) {
                tracing::debug!(%generation, "session is gone, dropping result");
            }
        }
        None => tracing::debug!(%generation, "results view is closed, dropping result"),
    }
}

async fn fetch_table(
    pool: &Pool,
    query: &str,
    row_limit: usize,
) -> Result<ResultTable, mysql_async::Error> {
    let mut conn = pool.get_conn().await?;
    let mut result = conn.query_iter(query).await?;
    let headers = result
        .columns_ref()
        .iter()
        .map(|column| column.name_str().into_owned())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    let mut truncated = false;
    while let Some(row) = result.next().await? {
        if rows.len() == row_limit {
            truncated = true;
            break;
        }
        rows.push(row_to_values(row));
    }
    result.drop_result().await?;

    Ok(ResultTable {
        headers,
        rows,
        truncated,
    })
}

async fn fetch_schema_nodes(pool: &Pool) -> Result<Vec<LayoutNode>, mysql_async::Error> {
    let mut conn = pool.get_conn().await?;
    let databases = conn
        .query_map("SHOW DATABASES", |database: String| database)
        .await?;

    let mut nodes = Vec::with_capacity(databases.len());
    for database in databases {
        let tables = conn
            .exec_map(
                "SELECT TABLE_NAME \
                 FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = ? \
                 ORDER BY TABLE_NAME",
                (database.clone(),),
                |table_name: String| table_name,
            )
            .await?;

        let children = tables
            .into_iter()
            .map(|table| {
                LayoutNode::new(table, LayoutKind::Table)
                    .with_schema(database.clone())
                    .with_database(database.clone())
            })
            .collect();
        nodes.push(
            LayoutNode::new(database.clone(), LayoutKind::Group)
                .with_schema(database)
                .with_children(children),
        );
    }

    Ok(nodes)
}

fn row_to_values(row: Row) -> Vec<String> {
    row.unwrap()
        .into_iter()
        .map(mysql_value_to_string)
        .collect()
}

fn mysql_value_to_string(value: Value) -> String {
    match value {
        Value::NULL => "NULL".to_string(),
        Value::Bytes(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Value::Int(value) => value.to_string(),
        Value::UInt(value) => value.to_string(),
        Value::Float(value) => value.to_string(),
        Value::Double(value) => value.to_string(),
        Value::Date(year, month, day, hour, minute, second, micros) => format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
        ),
        Value::Time(is_negative, days, hours, minutes, seconds, micros) => {
            let sign = if is_negative { "-" } else { "" };
            format!("{sign}{days:03} {hours:02}:{minutes:02}:{seconds:02}.{micros:06}")
        }
    }
}

fn to_backend_error(error: mysql_async::Error) -> BackendError {
    BackendError::new(error.to_string())
}
