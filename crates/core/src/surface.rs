use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::bridge::ResultDelivery;

pub const LOADING_PLACEHOLDER: &str = "Loading...";
pub const DEFAULT_WINDOW_HEIGHT: u16 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(u64);

impl WindowHandle {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u64);

impl BufferHandle {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Token identifying the command whose output the surface is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u64);

impl Generation {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[must_use]
    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SurfaceError {
    message: String,
}

impl SurfaceError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOptions {
    pub wrap: bool,
    pub fixed_height: bool,
    pub fixed_width: bool,
    pub line_numbers: bool,
}

impl WindowOptions {
    #[must_use]
    pub const fn results() -> Self {
        Self {
            wrap: false,
            fixed_height: true,
            fixed_width: true,
            line_numbers: false,
        }
    }
}

/// Window and buffer primitives of the host editor or terminal.
pub trait SurfaceProvider {
    fn open_split(&mut self, height: u16) -> Result<WindowHandle, SurfaceError>;
    /// Runs a host command expected to leave a new window focused.
    fn run_command(&mut self, command: &str) -> Result<WindowHandle, SurfaceError>;
    fn create_buffer(&mut self) -> Result<BufferHandle, SurfaceError>;
    fn bind_buffer(&mut self, window: WindowHandle, buffer: BufferHandle)
        -> Result<(), SurfaceError>;
    fn focus_window(&mut self, window: WindowHandle) -> Result<(), SurfaceError>;
    fn set_buffer_name(&mut self, buffer: BufferHandle, name: &str) -> Result<(), SurfaceError>;
    fn set_buffer_lines(
        &mut self,
        buffer: BufferHandle,
        lines: &[String],
    ) -> Result<(), SurfaceError>;
    fn set_buffer_writable(
        &mut self,
        buffer: BufferHandle,
        writable: bool,
    ) -> Result<(), SurfaceError>;
    fn apply_window_options(
        &mut self,
        window: WindowHandle,
        options: &WindowOptions,
    ) -> Result<(), SurfaceError>;
    fn is_window_valid(&self, window: WindowHandle) -> bool;
    fn is_buffer_valid(&self, buffer: BufferHandle) -> bool;
}

pub type OpenWindowFn =
    Box<dyn FnMut(&mut dyn SurfaceProvider) -> Result<WindowHandle, SurfaceError> + Send>;

/// How a fresh results window is obtained.
pub enum WindowOpener {
    Split { height: u16 },
    Command(String),
    Custom(OpenWindowFn),
}

impl Default for WindowOpener {
    fn default() -> Self {
        Self::Split {
            height: DEFAULT_WINDOW_HEIGHT,
        }
    }
}

impl fmt::Debug for WindowOpener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Split { height } => f.debug_struct("Split").field("height", height).finish(),
            Self::Command(command) => f.debug_tuple("Command").field(command).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceHandles {
    pub window: WindowHandle,
    pub buffer: BufferHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Applied(Generation),
    Stale(Generation),
}

/// Owns the single reusable results window and buffer.
#[derive(Debug)]
pub struct SurfaceController<P: SurfaceProvider> {
    provider: P,
    opener: WindowOpener,
    window: Option<WindowHandle>,
    buffer: Option<BufferHandle>,
    generation: Generation,
    buffers_named: u64,
}

impl<P: SurfaceProvider> SurfaceController<P> {
    #[must_use]
    pub fn new(provider: P, opener: WindowOpener) -> Self {
        Self {
            provider,
            opener,
            window: None,
            buffer: None,
            generation: Generation::default(),
            buffers_named: 0,
        }
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub fn handles(&self) -> Option<SurfaceHandles> {
        Some(SurfaceHandles {
            window: self.window?,
            buffer: self.buffer?,
        })
    }

    /// Makes sure a valid window shows a valid results buffer.
    ///
    /// `window` adopts a caller-supplied window instead of the stored one.
    /// A buffer gets its time-based name only when it is created; a reused
    /// buffer keeps the name it already has.
    pub fn ensure_open(
        &mut self,
        window: Option<WindowHandle>,
    ) -> Result<SurfaceHandles, SurfaceError> {
        let window = match window {
            Some(requested) if self.provider.is_window_valid(requested) => requested,
            Some(requested) => {
                return Err(SurfaceError::new(format!(
                    "window {} is not valid",
                    requested.raw()
                )))
            }
            None => match self.window {
                Some(existing) if self.provider.is_window_valid(existing) => existing,
                _ => self.open_window()?,
            },
        };

        let buffer = match self.buffer {
            Some(existing) if self.provider.is_buffer_valid(existing) => existing,
            _ => {
                let created = self.provider.create_buffer()?;
                let name = self.unique_buffer_name();
                self.provider.set_buffer_name(created, &name)?;
                tracing::debug!(buffer = created.raw(), %name, "created results buffer");
                created
            }
        };

        self.provider.bind_buffer(window, buffer)?;
        self.provider.focus_window(window)?;
        self.provider
            .apply_window_options(window, &WindowOptions::results())?;

        self.window = Some(window);
        self.buffer = Some(buffer);
        Ok(SurfaceHandles { window, buffer })
    }

    /// Clears the surface to a loading placeholder and starts a new
    /// generation; deliveries for older generations are dropped from now on.
    pub fn prepare_for_output(&mut self) -> Result<(SurfaceHandles, Generation), SurfaceError> {
        let handles = self.ensure_open(None)?;
        self.write_lines(handles.buffer, &[LOADING_PLACEHOLDER.to_string()])?;
        self.generation = self.generation.next();
        Ok((handles, self.generation))
    }

    pub fn apply_delivery(
        &mut self,
        delivery: &ResultDelivery,
    ) -> Result<DeliveryOutcome, SurfaceError> {
        let current_buffer = self
            .buffer
            .filter(|buffer| self.provider.is_buffer_valid(*buffer));
        if delivery.generation != self.generation || current_buffer != Some(delivery.buffer) {
            tracing::debug!(
                delivered = %delivery.generation,
                current = %self.generation,
                "discarding stale result delivery"
            );
            return Ok(DeliveryOutcome::Stale(delivery.generation));
        }

        self.write_lines(delivery.buffer, &delivery.lines)?;
        Ok(DeliveryOutcome::Applied(delivery.generation))
    }

    fn write_lines(&mut self, buffer: BufferHandle, lines: &[String]) -> Result<(), SurfaceError> {
        self.provider.set_buffer_writable(buffer, true)?;
        let written = self.provider.set_buffer_lines(buffer, lines);
        self.provider.set_buffer_writable(buffer, false)?;
        written
    }

    fn open_window(&mut self) -> Result<WindowHandle, SurfaceError> {
        match &mut self.opener {
            WindowOpener::Split { height } => self.provider.open_split(*height),
            WindowOpener::Command(command) => self.provider.run_command(command),
            WindowOpener::Custom(open) => open(&mut self.provider),
        }
    }

    fn unique_buffer_name(&mut self) -> String {
        self.buffers_named += 1;
        format!(
            "quarry-results-{}-{}",
            unix_timestamp_millis(),
            self.buffers_named
        )
    }
}

fn unix_timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
