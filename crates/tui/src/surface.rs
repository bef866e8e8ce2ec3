use std::collections::BTreeMap;

use quarry_core::surface::WindowOptions;
use quarry_core::{BufferHandle, SurfaceError, SurfaceProvider, WindowHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Bottom { height: u16 },
    Right,
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalWindow {
    pub placement: Placement,
    pub buffer: Option<BufferHandle>,
    pub options: WindowOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalBuffer {
    pub name: String,
    pub lines: Vec<String>,
    pub writable: bool,
}

/// Windows and buffers drawn by the terminal front end.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    next_handle: u64,
    windows: BTreeMap<WindowHandle, TerminalWindow>,
    buffers: BTreeMap<BufferHandle, TerminalBuffer>,
    focused: Option<WindowHandle>,
}

impl TerminalSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes a window the way a user would; its handle becomes invalid
    /// while the buffer it showed stays alive.
    pub fn close_window(&mut self, window: WindowHandle) -> bool {
        if self.focused == Some(window) {
            self.focused = None;
        }
        self.windows.remove(&window).is_some()
    }

    /// Deletes a buffer; windows that showed it are left empty.
    pub fn wipe_buffer(&mut self, buffer: BufferHandle) -> bool {
        for window in self.windows.values_mut() {
            if window.buffer == Some(buffer) {
                window.buffer = None;
            }
        }
        self.buffers.remove(&buffer).is_some()
    }

    #[must_use]
    pub fn focused(&self) -> Option<WindowHandle> {
        self.focused
    }

    #[must_use]
    pub fn window(&self, window: WindowHandle) -> Option<&TerminalWindow> {
        self.windows.get(&window)
    }

    #[must_use]
    pub fn buffer(&self, buffer: BufferHandle) -> Option<&TerminalBuffer> {
        self.buffers.get(&buffer)
    }

    /// The focused window together with the buffer bound to it.
    #[must_use]
    pub fn visible(&self) -> Option<(&TerminalWindow, &TerminalBuffer)> {
        let window = self.windows.get(&self.focused?)?;
        let buffer = self.buffers.get(&window.buffer?)?;
        Some((window, buffer))
    }

    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn add_window(&mut self, placement: Placement) -> WindowHandle {
        let window = WindowHandle::new(self.allocate());
        self.windows.insert(
            window,
            TerminalWindow {
                placement,
                buffer: None,
                options: WindowOptions {
                    wrap: true,
                    fixed_height: false,
                    fixed_width: false,
                    line_numbers: true,
                },
            },
        );
        self.focused = Some(window);
        window
    }

    fn window_mut(&mut self, window: WindowHandle) -> Result<&mut TerminalWindow, SurfaceError> {
        self.windows
            .get_mut(&window)
            .ok_or_else(|| SurfaceError::new(format!("window {} does not exist", window.raw())))
    }

    fn buffer_mut(&mut self, buffer: BufferHandle) -> Result<&mut TerminalBuffer, SurfaceError> {
        self.buffers
            .get_mut(&buffer)
            .ok_or_else(|| SurfaceError::new(format!("buffer {} does not exist", buffer.raw())))
    }
}

impl SurfaceProvider for TerminalSurface {
    fn open_split(&mut self, height: u16) -> Result<WindowHandle, SurfaceError> {
        Ok(self.add_window(Placement::Bottom { height }))
    }

    fn run_command(&mut self, command: &str) -> Result<WindowHandle, SurfaceError> {
        let mut parts = command.split_whitespace();
        let placement = match (parts.next(), parts.next()) {
            (Some("split" | "new"), None) => Placement::Bottom {
                height: quarry_core::surface::DEFAULT_WINDOW_HEIGHT,
            },
            (Some("split" | "new"), Some(height)) => Placement::Bottom {
                height: height.parse().map_err(|_| {
                    SurfaceError::new(format!("invalid split height `{height}`"))
                })?,
            },
            (Some("vsplit" | "vnew"), _) => Placement::Right,
            (Some("tabnew" | "only"), _) => Placement::Full,
            _ => {
                return Err(SurfaceError::new(format!(
                    "unsupported window command `{command}`"
                )))
            }
        };
        Ok(self.add_window(placement))
    }

    fn create_buffer(&mut self) -> Result<BufferHandle, SurfaceError> {
        let buffer = BufferHandle::new(self.allocate());
        self.buffers.insert(buffer, TerminalBuffer::default());
        Ok(buffer)
    }

    fn bind_buffer(
        &mut self,
        window: WindowHandle,
        buffer: BufferHandle,
    ) -> Result<(), SurfaceError> {
        if !self.buffers.contains_key(&buffer) {
            return Err(SurfaceError::new(format!(
                "buffer {} does not exist",
                buffer.raw()
            )));
        }
        self.window_mut(window)?.buffer = Some(buffer);
        Ok(())
    }

    fn focus_window(&mut self, window: WindowHandle) -> Result<(), SurfaceError> {
        self.window_mut(window)?;
        self.focused = Some(window);
        Ok(())
    }

    fn set_buffer_name(&mut self, buffer: BufferHandle, name: &str) -> Result<(), SurfaceError> {
        if self
            .buffers
            .iter()
            .any(|(handle, existing)| *handle != buffer && existing.name == name)
        {
            return Err(SurfaceError::new(format!("buffer name `{name}` is taken")));
        }
        self.buffer_mut(buffer)?.name = name.to_string();
        Ok(())
    }

    fn set_buffer_lines(
        &mut self,
        buffer: BufferHandle,
        lines: &[String],
    ) -> Result<(), SurfaceError> {
        let target = self.buffer_mut(buffer)?;
        if !target.writable {
            return Err(SurfaceError::new(format!(
                "buffer {} is read-only",
                buffer.raw()
            )));
        }
        target.lines = lines.to_vec();
        Ok(())
    }

    fn set_buffer_writable(
        &mut self,
        buffer: BufferHandle,
        writable: bool,
    ) -> Result<(), SurfaceError> {
        self.buffer_mut(buffer)?.writable = writable;
        Ok(())
    }

    fn apply_window_options(
        &mut self,
        window: WindowHandle,
        options: &WindowOptions,
    ) -> Result<(), SurfaceError> {
        self.window_mut(window)?.options = *options;
        Ok(())
    }

    fn is_window_valid(&self, window: WindowHandle) -> bool {
        self.windows.contains_key(&window)
    }

    fn is_buffer_valid(&self, buffer: BufferHandle) -> bool {
        self.buffers.contains_key(&buffer)
    }
}

#[cfg(test)]
mod tests {
    use quarry_core::surface::WindowOptions;
    use quarry_core::SurfaceProvider;

    use super::{Placement, TerminalSurface};

    #[test]
    fn window_commands_map_to_placements() {
        let mut surface = TerminalSurface::new();

        let split = surface.run_command("split 12").expect("split");
        let vsplit = surface.run_command("vsplit").expect("vsplit");
        let tab = surface.run_command("tabnew").expect("tabnew");

        assert_eq!(
            surface.window(split).map(|window| window.placement),
            Some(Placement::Bottom { height: 12 })
        );
        assert_eq!(
            surface.window(vsplit).map(|window| window.placement),
            Some(Placement::Right)
        );
        assert_eq!(
            surface.window(tab).map(|window| window.placement),
            Some(Placement::Full)
        );
        assert_eq!(surface.focused(), Some(tab));
        assert!(surface.run_command("botright 5sp").is_err());
        assert!(surface.run_command("split tall").is_err());
    }

    #[test]
    fn read_only_buffer_rejects_writes() {
        let mut surface = TerminalSurface::new();
        let buffer = surface.create_buffer().expect("buffer");

        assert!(surface
            .set_buffer_lines(buffer, &["x".to_string()])
            .is_err());
        surface
            .set_buffer_writable(buffer, true)
            .expect("writable");
        surface
            .set_buffer_lines(buffer, &["x".to_string()])
            .expect("write");
        assert_eq!(
            surface.buffer(buffer).map(|buffer| buffer.lines.clone()),
            Some(vec!["x".to_string()])
        );
    }

    #[test]
    fn buffer_names_are_unique() {
        let mut surface = TerminalSurface::new();
        let first = surface.create_buffer().expect("first");
        let second = surface.create_buffer().expect("second");

        surface.set_buffer_name(first, "results").expect("name");
        assert!(surface.set_buffer_name(second, "results").is_err());
        surface
            .set_buffer_name(first, "results")
            .expect("renaming to own name");
    }

    #[test]
    fn wiping_buffer_invalidates_handle_and_empties_window() {
        let mut surface = TerminalSurface::new();
        let window = surface.open_split(10).expect("split");
        let buffer = surface.create_buffer().expect("buffer");
        surface.bind_buffer(window, buffer).expect("bind");

        assert!(surface.wipe_buffer(buffer));
        assert!(!surface.is_buffer_valid(buffer));
        assert!(surface.is_window_valid(window));
        assert_eq!(surface.window(window).and_then(|window| window.buffer), None);
        assert!(surface.visible().is_none());
        assert!(!surface.wipe_buffer(buffer));
    }

    #[test]
    fn closing_window_invalidates_handle_but_keeps_buffer() {
        let mut surface = TerminalSurface::new();
        let window = surface.open_split(10).expect("split");
        let buffer = surface.create_buffer().expect("buffer");
        surface.bind_buffer(window, buffer).expect("bind");
        surface
            .apply_window_options(window, &WindowOptions::results())
            .expect("options");
        assert!(surface.visible().is_some());

        assert!(surface.close_window(window));
        assert!(!surface.is_window_valid(window));
        assert!(surface.is_buffer_valid(buffer));
        assert!(surface.visible().is_none());
        assert!(surface.bind_buffer(window, buffer).is_err());
    }
}
