pub mod commands;
pub mod surface;

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use quarry_core::{
    ActivateOutcome, AddOutcome, Connection, DeliveryOutcome, ExecutionBackend, LayoutKind,
    LayoutNode, Session, SessionError,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use thiserror::Error;
use tokio::runtime::Handle;

pub use commands::{parse_command, Command, CommandError};
pub use surface::{Placement, TerminalSurface};

const TICK_RATE: Duration = Duration::from_millis(80);
const SIDE_PANE_WIDTH: u16 = 40;

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    ToggleHelp,
    Input(char),
    Backspace,
    Submit,
    NextPage,
    PrevPage,
    CloseResults,
    Tick,
}

struct TuiApp<B: ExecutionBackend> {
    session: Session<B, TerminalSurface>,
    runtime: Handle,
    input: String,
    status_line: String,
    side_title: &'static str,
    side_lines: Vec<String>,
    show_help: bool,
    should_quit: bool,
}

impl<B: ExecutionBackend> TuiApp<B> {
    fn new(runtime: Handle, session: Session<B, TerminalSurface>) -> Self {
        let status_line = match session.active_id() {
            Some(id) => format!("Active connection: {id}"),
            None => "No connections yet. Try :add <name> <kind> <url>".to_string(),
        };
        Self {
            session,
            runtime,
            input: String::new(),
            status_line,
            side_title: "Connections",
            side_lines: Vec::new(),
            show_help: false,
            should_quit: false,
        }
    }

    fn handle(&mut self, msg: Msg) {
        match msg {
            Msg::Quit => self.should_quit = true,
            Msg::ToggleHelp => self.show_help = !self.show_help,
            Msg::Input(ch) => self.input.push(ch),
            Msg::Backspace => {
                self.input.pop();
            }
            Msg::Submit => self.submit(),
            Msg::NextPage => self.run_command(Command::Next(None)),
            Msg::PrevPage => self.run_command(Command::Prev(None)),
            Msg::CloseResults => {
                if self.close_results_window() {
                    self.status_line = "Results window closed".to_string();
                }
            }
            Msg::Tick => self.on_tick(),
        }
    }

    fn submit(&mut self) {
        let line = std::mem::take(&mut self.input);
        match parse_command(&line) {
            Ok(command) => self.run_command(command),
            Err(CommandError::Empty) => {}
            Err(error) => self.status_line = error.to_string(),
        }
    }

    fn run_command(&mut self, command: Command) {
        tracing::debug!(?command, "dispatching command");
        self.status_line = match self.dispatch(command) {
            Ok(status) => status,
            Err(error) => {
                tracing::warn!(%error, "command failed");
                format!("Error: {error}")
            }
        };
    }

    fn dispatch(&mut self, command: Command) -> Result<String, SessionError> {
        let runtime = self.runtime.clone();
        match command {
            Command::Connections => {
                self.show_connections();
                Ok(format!("{} connection(s)", self.session.registry().len()))
            }
            Command::Use(id) => Ok(match self.session.set_active(&id) {
                ActivateOutcome::Activated(id) => format!("Active connection: {id}"),
                ActivateOutcome::Ignored => {
                    format!("Unknown connection `{id}`, active connection unchanged")
                }
            }),
            Command::Add(spec) => {
                let outcome = runtime.block_on(self.session.add_connection(spec))?;
                self.show_connections();
                Ok(match outcome {
                    AddOutcome::Inserted(id) => format!("Added connection {id}"),
                    AddOutcome::Duplicate(id) => format!("Connection {id} is already registered"),
                })
            }
            Command::Details(id) => {
                let Some(connection) = self.session.connection_details(id.as_deref()) else {
                    return Ok("No such connection".to_string());
                };
                self.side_title = "Details";
                self.side_lines = details_lines(connection);
                Ok(format!("Details for {}", connection.id))
            }
            Command::Execute { query, target } => {
                let generation =
                    runtime.block_on(self.session.execute(&query, target.as_deref()))?;
                Ok(format!("Running query {generation}"))
            }
            Command::Next(target) => {
                let shown = runtime.block_on(self.session.page_next(target.as_deref()))?;
                Ok(format!("Page {}", shown + 1))
            }
            Command::Prev(target) => {
                let shown = runtime.block_on(self.session.page_prev(target.as_deref()))?;
                Ok(format!("Page {}", shown + 1))
            }
            Command::History { history_id, target } => {
                let generation =
                    runtime.block_on(self.session.history(&history_id, target.as_deref()))?;
                Ok(format!("Replaying {history_id} {generation}"))
            }
            Command::Layout(target) => {
                let nodes = runtime.block_on(self.session.layout(target.as_deref()))?;
                self.side_title = "Layout";
                self.side_lines = layout_lines(&nodes);
                Ok(format!("Loaded layout with {} top-level node(s)", nodes.len()))
            }
            Command::Save {
                format,
                destination,
                target,
            } => {
                runtime.block_on(self.session.save(format, &destination, target.as_deref()))?;
                Ok(format!("Saved {format} to {}", destination.display()))
            }
            Command::Open => {
                runtime.block_on(self.session.open(None))?;
                Ok("Results window open".to_string())
            }
            Command::Close => {
                runtime.block_on(self.session.close())?;
                self.close_results_window();
                Ok("Results closed".to_string())
            }
            Command::Wipe => {
                let Some(handles) = self.session.surface().handles() else {
                    return Ok("No results buffer".to_string());
                };
                self.session
                    .surface_mut()
                    .provider_mut()
                    .wipe_buffer(handles.buffer);
                Ok("Results buffer wiped".to_string())
            }
            Command::Help => {
                self.show_help = true;
                Ok("F1 toggles help".to_string())
            }
            Command::Quit => {
                self.should_quit = true;
                Ok("Bye".to_string())
            }
        }
    }

    fn on_tick(&mut self) {
        match self.session.pump_deliveries() {
            Ok(outcomes) => {
                if let Some(DeliveryOutcome::Applied(generation)) = outcomes
                    .iter()
                    .rev()
                    .find(|outcome| matches!(outcome, DeliveryOutcome::Applied(_)))
                {
                    self.status_line = format!("Results updated {generation}");
                }
            }
            Err(error) => {
                tracing::warn!(%error, "failed to apply result delivery");
                self.status_line = format!("Error: {error}");
            }
        }
    }

    fn close_results_window(&mut self) -> bool {
        let Some(handles) = self.session.surface().handles() else {
            return false;
        };
        self.session
            .surface_mut()
            .provider_mut()
            .close_window(handles.window)
    }

    fn show_connections(&mut self) {
        let active = self.session.active_id().cloned();
        self.side_title = "Connections";
        self.side_lines = self
            .session
            .list_connections()
            .into_iter()
            .map(|connection| {
                let marker = if active.as_ref() == Some(&connection.id) {
                    "*"
                } else {
                    " "
                };
                format!("{marker} {} ({})", connection.id, connection.kind)
            })
            .collect();
    }
}

/// Runs the terminal front end until the user quits. Session calls are
/// driven on `runtime` from the UI thread.
pub fn run<B: ExecutionBackend>(
    runtime: Handle,
    session: Session<B, TerminalSurface>,
) -> Result<(), TuiError> {
    let mut terminal = setup_terminal()?;
    let mut app = TuiApp::new(runtime, session);
    let run_result = run_loop(&mut terminal, &mut app);
    let restore_result = restore_terminal(&mut terminal);

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop<B: ExecutionBackend>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut TuiApp<B>,
) -> Result<(), TuiError> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| render(frame, app))?;

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(message) = map_key_event(key) {
                        app.handle(message);
                    }
                }
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.handle(Msg::Tick);
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn render<B: ExecutionBackend>(frame: &mut Frame<'_>, app: &TuiApp<B>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(
                " Connection: {} ",
                app.session
                    .active_id()
                    .map_or("none", |id| id.as_str())
            ),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(format!("Page: {}", app.session.current_page() + 1)),
        Span::raw(" | "),
        Span::raw(format!("Command: {}", app.session.surface().generation())),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Quarry"));
    frame.render_widget(header, chunks[0]);

    let workspace = if app.side_lines.is_empty() {
        chunks[1]
    } else {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(SIDE_PANE_WIDTH)])
            .split(chunks[1]);
        let side = Paragraph::new(
            app.side_lines
                .iter()
                .map(|line| Line::from(line.as_str()))
                .collect::<Vec<_>>(),
        )
        .block(Block::default().borders(Borders::ALL).title(app.side_title));
        frame.render_widget(side, columns[1]);
        columns[0]
    };
    render_workspace(frame, app, workspace);

    let input = Paragraph::new(vec![
        Line::from(format!("> {}", app.input)),
        Line::from(format!("Status: {}", app.status_line)),
    ])
    .block(Block::default().borders(Borders::ALL).title("Command"));
    frame.render_widget(input, chunks[2]);

    if app.show_help {
        render_help_popup(frame);
    }
}

fn render_workspace<B: ExecutionBackend>(frame: &mut Frame<'_>, app: &TuiApp<B>, area: Rect) {
    let hint = Paragraph::new(vec![
        Line::from("Type SQL and press Enter to run it on the active connection."),
        Line::from(":connections, :use <id>, :layout, :help for more."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Workspace"))
    .alignment(Alignment::Left);

    let Some((window, buffer)) = app.session.surface().provider().visible() else {
        frame.render_widget(hint, area);
        return;
    };

    let results_area = match window.placement {
        Placement::Full => area,
        Placement::Bottom { height } => {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(height.saturating_add(2))])
                .split(area);
            frame.render_widget(hint, rows[0]);
            rows[1]
        }
        Placement::Right => {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(area);
            frame.render_widget(hint, columns[0]);
            columns[1]
        }
    };

    let lines = buffer
        .lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            if window.options.line_numbers {
                Line::from(format!("{:>4} {line}", index + 1))
            } else {
                Line::from(line.as_str())
            }
        })
        .collect::<Vec<_>>();
    let mut results = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(buffer.name.as_str()),
    );
    if window.options.wrap {
        results = results.wrap(Wrap { trim: false });
    }
    frame.render_widget(results, results_area);
}

fn render_help_popup(frame: &mut Frame<'_>) {
    let area = centered_rect(70, 70, frame.area());
    frame.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from("Commands"),
        Line::from("<sql> or :exec[@id] <sql>: run a query"),
        Line::from(":next / :prev, Ctrl+N / Ctrl+P: page results"),
        Line::from(":history <hid>: replay a history entry"),
        Line::from(":connections, :use <id>, :details [id]"),
        Line::from(":add <name> <kind> <url>"),
        Line::from(":layout, :save <csv|json> <path>"),
        Line::from(":open, :close, Ctrl+W: results window"),
        Line::from(":wipe: discard the results buffer"),
        Line::from("Esc / Ctrl+C / :quit: quit, F1: toggle help"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, area);
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100_u16 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100_u16 - height_percent) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100_u16 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100_u16 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

fn map_key_event(key: KeyEvent) -> Option<Msg> {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) | (_, KeyCode::Esc) => Some(Msg::Quit),
        (KeyModifiers::CONTROL, KeyCode::Char('n')) => Some(Msg::NextPage),
        (KeyModifiers::CONTROL, KeyCode::Char('p')) => Some(Msg::PrevPage),
        (KeyModifiers::CONTROL, KeyCode::Char('w')) => Some(Msg::CloseResults),
        (_, KeyCode::F(1)) => Some(Msg::ToggleHelp),
        (_, KeyCode::Enter) => Some(Msg::Submit),
        (_, KeyCode::Backspace) => Some(Msg::Backspace),
        (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(ch)) => Some(Msg::Input(ch)),
        _ => None,
    }
}

/// Flattens a layout tree into indented lines for the side pane.
#[must_use]
pub fn layout_lines(nodes: &[LayoutNode]) -> Vec<String> {
    let mut lines = Vec::new();
    push_layout_lines(nodes, 0, &mut lines);
    lines
}

fn push_layout_lines(nodes: &[LayoutNode], depth: usize, lines: &mut Vec<String>) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        let label = match node.kind {
            LayoutKind::Group => String::new(),
            LayoutKind::Table => " [table]".to_string(),
            LayoutKind::History => " [history]".to_string(),
            LayoutKind::Record => " [record]".to_string(),
            LayoutKind::Scratch => " [scratch]".to_string(),
        };
        lines.push(format!("{indent}{}{label}", node.name));
        push_layout_lines(&node.children, depth + 1, lines);
    }
}

fn details_lines(connection: &Connection) -> Vec<String> {
    vec![
        format!("id:   {}", connection.id),
        format!("name: {}", connection.name),
        format!("kind: {}", connection.kind),
        format!("url:  {}", connection.url),
    ]
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use quarry_core::{
        BackendError, ConnectionId, ConnectionSpec, ExecutionBackend, Generation, LayoutKind,
        LayoutNode, ResultSink, SaveFormat, Session, SessionOptions,
    };
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use tokio::runtime::{Builder, Runtime};

    use super::{layout_lines, map_key_event, render, Msg, TerminalSurface, TuiApp};

    #[derive(Debug, Default)]
    struct EchoBackend {
        sink: Mutex<Option<ResultSink>>,
    }

    impl EchoBackend {
        fn deliver(&self, generation: Generation, lines: Vec<String>) {
            if let Some(sink) = self.sink.lock().expect("sink lock").as_ref() {
                sink.deliver(generation, lines);
            }
        }
    }

    #[async_trait]
    impl ExecutionBackend for EchoBackend {
        async fn register_connection(
            &self,
            _id: &ConnectionId,
            _url: &str,
            _kind: &str,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn execute(
            &self,
            id: &ConnectionId,
            query: &str,
            generation: Generation,
        ) -> Result<(), BackendError> {
            self.deliver(generation, vec![format!("{id}: {query}")]);
            Ok(())
        }

        async fn page(
            &self,
            _id: &ConnectionId,
            requested: i64,
            generation: Generation,
        ) -> Result<i64, BackendError> {
            let shown = requested.clamp(0, 2);
            self.deliver(generation, vec![format!("page {shown}")]);
            Ok(shown)
        }

        async fn history(
            &self,
            _id: &ConnectionId,
            history_id: &str,
            _generation: Generation,
        ) -> Result<(), BackendError> {
            Err(BackendError::new(format!("unknown history id {history_id}")))
        }

        async fn layout(&self, _id: &ConnectionId) -> Result<String, BackendError> {
            Ok(r#"[{"name":"app","kind":"","children":[{"name":"users","kind":"table"}]}]"#
                .to_string())
        }

        async fn save(
            &self,
            _id: &ConnectionId,
            _format: SaveFormat,
            _destination: &Path,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn set_results_sink(&self, sink: ResultSink) -> Result<(), BackendError> {
            *self.sink.lock().expect("sink lock") = Some(sink);
            Ok(())
        }

        async fn close_results(&self) -> Result<(), BackendError> {
            *self.sink.lock().expect("sink lock") = None;
            Ok(())
        }
    }

    fn runtime() -> Runtime {
        Builder::new_current_thread()
            .build()
            .expect("runtime should build")
    }

    fn app_with_connection(runtime: &Runtime) -> TuiApp<EchoBackend> {
        let session = runtime
            .block_on(Session::new(
                EchoBackend::default(),
                TerminalSurface::new(),
                SessionOptions {
                    connections: vec![ConnectionSpec::new("local", "mysql", "mysql://localhost")],
                    ..SessionOptions::default()
                },
            ))
            .expect("session should start");
        TuiApp::new(runtime.handle().clone(), session)
    }

    fn type_line(app: &mut TuiApp<EchoBackend>, line: &str) {
        for ch in line.chars() {
            app.handle(Msg::Input(ch));
        }
        app.handle(Msg::Submit);
    }

    fn visible_lines(app: &TuiApp<EchoBackend>) -> Vec<String> {
        app.session
            .surface()
            .provider()
            .visible()
            .map(|(_, buffer)| buffer.lines.clone())
            .unwrap_or_default()
    }

    #[test]
    fn keymap_supports_paging_and_quit_keys() {
        assert_eq!(
            map_key_event(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL)),
            Some(Msg::NextPage)
        );
        assert_eq!(
            map_key_event(KeyEvent::new(KeyCode::Char('p'), KeyModifiers::CONTROL)),
            Some(Msg::PrevPage)
        );
        assert_eq!(
            map_key_event(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL)),
            Some(Msg::CloseResults)
        );
        assert_eq!(
            map_key_event(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            Some(Msg::Quit)
        );
        assert_eq!(
            map_key_event(KeyEvent::new(KeyCode::Char('S'), KeyModifiers::SHIFT)),
            Some(Msg::Input('S'))
        );
        assert_eq!(
            map_key_event(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT)),
            None
        );
    }

    #[test]
    fn layout_lines_indent_children() {
        let nodes = vec![
            LayoutNode::new("app", LayoutKind::Group).with_children(vec![
                LayoutNode::new("users", LayoutKind::Table),
                LayoutNode::new("orders", LayoutKind::Table),
            ]),
            LayoutNode::new("history", LayoutKind::Group)
                .with_children(vec![LayoutNode::new("h1", LayoutKind::History)]),
        ];

        assert_eq!(
            layout_lines(&nodes),
            vec![
                "app".to_string(),
                "  users [table]".to_string(),
                "  orders [table]".to_string(),
                "history".to_string(),
                "  h1 [history]".to_string(),
            ]
        );
    }

    #[test]
    fn typed_query_runs_and_delivery_lands_on_tick() {
        let runtime = runtime();
        let mut app = app_with_connection(&runtime);

        type_line(&mut app, "select 1");
        assert_eq!(visible_lines(&app), vec!["Loading...".to_string()]);
        assert!(app.input.is_empty());

        app.handle(Msg::Tick);
        assert_eq!(visible_lines(&app), vec!["localmysql: select 1".to_string()]);
        assert!(app.status_line.starts_with("Results updated"));

        app.handle(Msg::NextPage);
        app.handle(Msg::Tick);
        assert_eq!(visible_lines(&app), vec!["page 1".to_string()]);
        assert_eq!(app.session.current_page(), 1);
    }

    #[test]
    fn closed_window_is_recreated_by_next_command() {
        let runtime = runtime();
        let mut app = app_with_connection(&runtime);

        type_line(&mut app, ":open");
        assert!(app.session.surface().provider().visible().is_some());

        app.handle(Msg::CloseResults);
        assert!(app.session.surface().provider().visible().is_none());

        type_line(&mut app, ":exec select 2");
        app.handle(Msg::Tick);
        assert_eq!(visible_lines(&app), vec!["localmysql: select 2".to_string()]);
    }

    #[test]
    fn wiped_buffer_is_replaced_by_next_command() {
        let runtime = runtime();
        let mut app = app_with_connection(&runtime);

        type_line(&mut app, "select 1");
        app.handle(Msg::Tick);
        let old_buffer = app.session.surface().handles().expect("open").buffer;

        type_line(&mut app, ":wipe");
        assert_eq!(app.status_line, "Results buffer wiped");
        assert!(app.session.surface().provider().visible().is_none());

        type_line(&mut app, "select 2");
        app.handle(Msg::Tick);
        let new_buffer = app.session.surface().handles().expect("open").buffer;
        assert_ne!(old_buffer, new_buffer);
        assert_eq!(visible_lines(&app), vec!["localmysql: select 2".to_string()]);
    }

    #[test]
    fn failures_are_reported_in_status_line() {
        let runtime = runtime();
        let mut app = app_with_connection(&runtime);

        type_line(&mut app, ":history h9");
        assert_eq!(
            app.status_line,
            "Error: execution backend failed: unknown history id h9"
        );

        type_line(&mut app, ":next@missing");
        assert_eq!(app.status_line, "Error: unknown connection `missing`");

        type_line(&mut app, ":use missing");
        assert_eq!(
            app.status_line,
            "Unknown connection `missing`, active connection unchanged"
        );
        assert_eq!(
            app.session.active_id().map(ConnectionId::as_str),
            Some("localmysql")
        );
    }

    #[test]
    fn layout_and_connections_fill_side_pane() {
        let runtime = runtime();
        let mut app = app_with_connection(&runtime);

        type_line(&mut app, ":add reports mysql mysql://reports");
        assert_eq!(app.status_line, "Added connection reportsmysql");
        assert_eq!(
            app.side_lines,
            vec![
                "* localmysql (mysql)".to_string(),
                "  reportsmysql (mysql)".to_string()
            ]
        );

        type_line(&mut app, ":layout");
        assert_eq!(app.side_title, "Layout");
        assert_eq!(
            app.side_lines,
            vec!["app".to_string(), "  users [table]".to_string()]
        );
    }

    #[test]
    fn render_shows_results_buffer() {
        let runtime = runtime();
        let mut app = app_with_connection(&runtime);
        type_line(&mut app, "select 42");
        app.handle(Msg::Tick);

        let mut terminal = Terminal::new(TestBackend::new(100, 40)).expect("terminal");
        terminal
            .draw(|frame| render(frame, &app))
            .expect("draw should succeed");

        let screen = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect::<String>();
        assert!(screen.contains("localmysql: select 42"));
        assert!(screen.contains("quarry-results-"));
        assert!(screen.contains("Connection: localmysql"));
    }
}
