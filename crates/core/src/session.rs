use std::path::Path;

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use crate::bridge::{BackendError, ExecutionBackend, ResultDelivery, ResultSink, SaveFormat};
use crate::connections::{
    ActivateOutcome, AddOutcome, ConfigError, Connection, ConnectionId, ConnectionRegistry,
    ConnectionSpec,
};
use crate::layout::{parse_layout, LayoutNode};
use crate::paging::PageCursor;
use crate::surface::{
    DeliveryOutcome, Generation, SurfaceController, SurfaceError, SurfaceHandles,
    SurfaceProvider, WindowHandle, WindowOpener,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid connection: {0}")]
    Config(#[from] ConfigError),
    #[error("unknown connection `{0}`")]
    UnknownConnection(String),
    #[error("no active connection")]
    NoActiveConnection,
    #[error("execution backend failed: {0}")]
    Backend(#[source] BackendError),
    #[error("display surface failed: {0}")]
    Surface(#[from] SurfaceError),
    #[error("backend returned a malformed layout: {0}")]
    MalformedLayout(#[source] serde_json::Error),
}

#[derive(Debug, Default)]
pub struct SessionOptions {
    pub connections: Vec<ConnectionSpec>,
    pub window: WindowOpener,
}

/// Everything one exploration session owns: the known connections, the
/// active selection, the shared paging cursor and the results surface.
#[derive(Debug)]
pub struct Session<B: ExecutionBackend, P: SurfaceProvider> {
    backend: B,
    registry: ConnectionRegistry,
    cursor: PageCursor,
    surface: SurfaceController<P>,
    sender: UnboundedSender<ResultDelivery>,
    deliveries: UnboundedReceiver<ResultDelivery>,
}

impl<B: ExecutionBackend, P: SurfaceProvider> Session<B, P> {
    /// Registers every initial connection with the backend and activates the
    /// one with the smallest id. The first invalid descriptor aborts
    /// construction.
    pub async fn new(backend: B, provider: P, options: SessionOptions) -> Result<Self, SessionError> {
        let (sender, deliveries) = mpsc::unbounded_channel();
        let mut session = Self {
            backend,
            registry: ConnectionRegistry::new(),
            cursor: PageCursor::new(),
            surface: SurfaceController::new(provider, options.window),
            sender,
            deliveries,
        };

        for spec in &options.connections {
            let connection = session.registry.candidate(spec)?;
            session.register(&connection).await?;
            session.registry.insert(connection);
        }
        session.registry.activate_smallest();

        Ok(session)
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub fn surface(&self) -> &SurfaceController<P> {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut SurfaceController<P> {
        &mut self.surface
    }

    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    #[must_use]
    pub fn active_id(&self) -> Option<&ConnectionId> {
        self.registry.active_id()
    }

    #[must_use]
    pub fn current_page(&self) -> i64 {
        self.cursor.current()
    }

    pub async fn add_connection(&mut self, spec: ConnectionSpec) -> Result<AddOutcome, SessionError> {
        let connection = self.registry.candidate(&spec)?;
        if self.registry.contains_source(&connection) {
            tracing::debug!(connection = %connection.id, "connection already registered");
            return Ok(AddOutcome::Duplicate(connection.id));
        }

        self.register(&connection).await?;
        let id = connection.id.clone();
        self.registry.insert(connection);
        Ok(AddOutcome::Inserted(id))
    }

    pub fn set_active(&mut self, id: &str) -> ActivateOutcome {
        self.registry.set_active(id)
    }

    #[must_use]
    pub fn list_connections(&self) -> Vec<&Connection> {
        self.registry.list()
    }

    #[must_use]
    pub fn connection_details(&self, id: Option<&str>) -> Option<&Connection> {
        self.registry.details(id)
    }

    pub async fn execute(&mut self, query: &str, id: Option<&str>) -> Result<Generation, SessionError> {
        let id = self.resolve(id)?;
        let generation = self.prepare_output().await?;
        self.cursor.reset();
        tracing::debug!(connection = %id, %generation, "executing query");
        self.backend
            .execute(&id, query, generation)
            .await
            .map_err(SessionError::Backend)?;
        Ok(generation)
    }

    pub async fn history(
        &mut self,
        history_id: &str,
        id: Option<&str>,
    ) -> Result<Generation, SessionError> {
        let id = self.resolve(id)?;
        let generation = self.prepare_output().await?;
        self.cursor.reset();
        tracing::debug!(connection = %id, history_id, %generation, "replaying history entry");
        self.backend
            .history(&id, history_id, generation)
            .await
            .map_err(SessionError::Backend)?;
        Ok(generation)
    }

    pub async fn page_next(&mut self, id: Option<&str>) -> Result<i64, SessionError> {
        self.page(id, 1).await
    }

    pub async fn page_prev(&mut self, id: Option<&str>) -> Result<i64, SessionError> {
        self.page(id, -1).await
    }

    pub async fn layout(&self, id: Option<&str>) -> Result<Vec<LayoutNode>, SessionError> {
        let id = self.resolve(id)?;
        let raw = self
            .backend
            .layout(&id)
            .await
            .map_err(SessionError::Backend)?;
        parse_layout(&raw).map_err(SessionError::MalformedLayout)
    }

    pub async fn save(
        &self,
        format: SaveFormat,
        destination: &Path,
        id: Option<&str>,
    ) -> Result<(), SessionError> {
        let id = self.resolve(id)?;
        self.backend
            .save(&id, format, destination)
            .await
            .map_err(SessionError::Backend)
    }

    pub async fn open(&mut self, window: Option<WindowHandle>) -> Result<SurfaceHandles, SessionError> {
        let handles = self.surface.ensure_open(window)?;
        self.attach_sink(handles).await?;
        Ok(handles)
    }

    /// Dismisses the results view. Window and buffer are reclaimed lazily by
    /// the next open.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        self.backend
            .close_results()
            .await
            .map_err(SessionError::Backend)
    }

    /// Applies every queued backend delivery without waiting.
    pub fn pump_deliveries(&mut self) -> Result<Vec<DeliveryOutcome>, SessionError> {
        let mut outcomes = Vec::new();
        loop {
            match self.deliveries.try_recv() {
                Ok(delivery) => outcomes.push(self.surface.apply_delivery(&delivery)?),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return Ok(outcomes),
            }
        }
    }

    /// Waits for the next backend delivery and applies it.
    pub async fn next_delivery(&mut self) -> Result<Option<DeliveryOutcome>, SessionError> {
        let Some(delivery) = self.deliveries.recv().await else {
            return Ok(None);
        };
        Ok(Some(self.surface.apply_delivery(&delivery)?))
    }

    async fn page(&mut self, id: Option<&str>, delta: i64) -> Result<i64, SessionError> {
        let id = self.resolve(id)?;
        let generation = self.prepare_output().await?;
        let requested = self.cursor.requested(delta);
        let shown = self
            .backend
            .page(&id, requested, generation)
            .await
            .map_err(SessionError::Backend)?;
        tracing::debug!(connection = %id, requested, shown, "paged results");
        self.cursor.accept(shown);
        Ok(shown)
    }

    async fn register(&self, connection: &Connection) -> Result<(), SessionError> {
        tracing::info!(connection = %connection.id, kind = %connection.kind, "registering connection");
        self.backend
            .register_connection(&connection.id, &connection.url, &connection.kind)
            .await
            .map_err(SessionError::Backend)
    }

    async fn prepare_output(&mut self) -> Result<Generation, SessionError> {
        let (handles, generation) = self.surface.prepare_for_output()?;
        self.attach_sink(handles).await?;
        Ok(generation)
    }

    async fn attach_sink(&self, handles: SurfaceHandles) -> Result<(), SessionError> {
        let sink = ResultSink::new(handles.buffer, self.sender.clone());
        self.backend
            .set_results_sink(sink)
            .await
            .map_err(SessionError::Backend)
    }

    fn resolve(&self, id: Option<&str>) -> Result<ConnectionId, SessionError> {
        match id {
            Some(raw) => {
                let id = ConnectionId::from(raw);
                if self.registry.get(&id).is_none() {
                    return Err(SessionError::UnknownConnection(raw.to_string()));
                }
                Ok(id)
            }
            None => self
                .registry
                .active_id()
                .cloned()
                .ok_or(SessionError::NoActiveConnection),
        }
    }
}
