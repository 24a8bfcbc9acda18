use crate::data::{self, CourseRow};
use log::{debug, error};
use pipeline::aggregate::Category;
use pipeline::{recompute, DerivedMetrics, Selection, StudentTable};
use std::{error::Error, io};

use ratatui::{
    backend::{Backend, CrosstermBackend},
    crossterm::{
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    },
    layout::{Constraint, Layout, Margin, Rect},
    style::{self, Color, Modifier, Style, Stylize},
    Frame, Terminal,
    text::{Line, Span, Text},
    widgets::{
        Block, BorderType, Cell, HighlightSpacing, List, ListItem, ListState, Paragraph, Row,
        Scrollbar, ScrollbarOrientation, ScrollbarState, Table, TableState,
    },
};
use style::palette::tailwind;
use unicode_width::UnicodeWidthStr;

const PALETTES: [tailwind::Palette; 4] = [
    tailwind::BLUE,
    tailwind::EMERALD,
    tailwind::INDIGO,
    tailwind::RED,
];
const INFO_TEXT: &str =
    "(Esc) quit | (Tab) switch panel | (↑) move up | (↓) move down | (→) next color | (←) previous color";

const ITEM_HEIGHT: usize = 1;

struct TableColors {
    buffer_bg: Color,
    header_bg: Color,
    header_fg: Color,
    row_fg: Color,
    selected_style_fg: Color,
    highlight_row_bg: Color,
    normal_row_color: Color,
    alt_row_color: Color,
    footer_border_color: Color,
    reference_fg: Color,
}

impl TableColors {
    const fn new(color: &tailwind::Palette) -> Self {
        Self {
            buffer_bg: tailwind::SLATE.c950,
            header_bg: color.c900,
            header_fg: tailwind::SLATE.c200,
            row_fg: tailwind::SLATE.c200,
            selected_style_fg: color.c400,
            highlight_row_bg: color.c700,
            normal_row_color: tailwind::SLATE.c950,
            alt_row_color: tailwind::SLATE.c900,
            footer_border_color: color.c400,
            reference_fg: tailwind::RED.c400,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Modality,
    Course,
    Table,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Modality => Focus::Course,
            Focus::Course => Focus::Table,
            Focus::Table => Focus::Modality,
        }
    }
}

struct App<'a> {
    table: &'a StudentTable,
    selection: Selection,
    metrics: DerivedMetrics,
    items: Vec<CourseRow>,
    modalities: Vec<String>,
    courses: Vec<String>,
    focus: Focus,
    modality_state: ListState,
    course_state: ListState,
    state: TableState,
    longest_item_lens: [u16; 7],
    scroll_state: ScrollbarState,
    colors: TableColors,
    color_index: usize,
    message: Option<String>,
}

impl<'a> App<'a> {
    fn new(table: &'a StudentTable, selection: Selection) -> Result<Self, pipeline::PipelineError> {
        let metrics = recompute(table, &selection)?;
        let items = data::course_rows(&metrics);
        let modalities: Vec<String> = table.modalities().into_iter().map(String::from).collect();
        let courses: Vec<String> = table
            .courses(&selection.modality)
            .into_iter()
            .map(String::from)
            .collect();
        let modality_idx = modalities.iter().position(|m| *m == selection.modality);
        let course_idx = courses.iter().position(|c| *c == selection.course);
        Ok(Self {
            table,
            selection,
            longest_item_lens: constraint_len_calculator(&items),
            scroll_state: ScrollbarState::new(items.len().saturating_sub(1) * ITEM_HEIGHT),
            items,
            metrics,
            modalities,
            courses,
            focus: Focus::Modality,
            modality_state: ListState::default().with_selected(modality_idx),
            course_state: ListState::default().with_selected(course_idx),
            state: TableState::default().with_selected(0),
            colors: TableColors::new(&PALETTES[0]),
            color_index: 0,
            message: None,
        })
    }

    /// 选择变化后重新计算所有指标
    fn apply(&mut self, selection: Selection) {
        match recompute(self.table, &selection) {
            Ok(metrics) => {
                debug!("selection applied: {:?}", selection);
                self.courses = self
                    .table
                    .courses(&selection.modality)
                    .into_iter()
                    .map(String::from)
                    .collect();
                let course_idx = self.courses.iter().position(|c| *c == selection.course);
                self.course_state.select(course_idx);
                self.items = data::course_rows(&metrics);
                self.longest_item_lens = constraint_len_calculator(&self.items);
                self.scroll_state =
                    ScrollbarState::new(self.items.len().saturating_sub(1) * ITEM_HEIGHT);
                self.state.select(Some(0));
                self.metrics = metrics;
                self.selection = selection;
                self.message = None;
            }
            Err(e) => {
                error!("recompute failed: {}", e);
                self.message = Some(e.to_string());
            }
        }
    }

    fn select_modality(&mut self, i: usize) {
        let Some(modality) = self.modalities.get(i).cloned() else {
            return;
        };
        self.modality_state.select(Some(i));
        match self.selection.with_modality(self.table, &modality) {
            Ok(selection) => self.apply(selection),
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    fn select_course(&mut self, i: usize) {
        let Some(course) = self.courses.get(i).cloned() else {
            return;
        };
        self.course_state.select(Some(i));
        match self.selection.with_course(self.table, &course) {
            Ok(selection) => self.apply(selection),
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    fn step(&mut self, forward: bool) {
        match self.focus {
            Focus::Modality => {
                let i = cycle(self.modality_state.selected(), self.modalities.len(), forward);
                self.select_modality(i);
            }
            Focus::Course => {
                let i = cycle(self.course_state.selected(), self.courses.len(), forward);
                self.select_course(i);
            }
            Focus::Table => {
                let i = cycle(self.state.selected(), self.items.len(), forward);
                self.state.select(Some(i));
                self.scroll_state = self.scroll_state.position(i * ITEM_HEIGHT);
            }
        }
    }

    pub fn next(&mut self) {
        self.step(true);
    }

    pub fn previous(&mut self) {
        self.step(false);
    }

    pub fn next_focus(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn next_color(&mut self) {
        self.color_index = (self.color_index + 1) % PALETTES.len();
    }

    pub fn previous_color(&mut self) {
        let count = PALETTES.len();
        self.color_index = (self.color_index + count - 1) % count;
    }

    pub fn set_colors(&mut self) {
        self.colors = TableColors::new(&PALETTES[self.color_index]);
    }
}

/// Wraps around at both ends; an empty list stays at 0.
fn cycle(current: Option<usize>, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    match current {
        Some(i) if forward => (i + 1) % len,
        Some(i) => (i + len - 1) % len,
        None => 0,
    }
}

pub fn run(table: &StudentTable, selection: Selection) -> Result<(), Box<dyn Error>> {
    // build the first frame before touching the terminal so errors print normally
    let app = App::new(table, selection)?;

    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app_result(res)
}

/// 终端恢复之后再把界面循环的错误交给调用方
fn app_result(res: io::Result<()>) -> Result<(), Box<dyn Error>> {
    res.map_err(|err| {
        debug!("dashboard loop stopped: {}", err);
        err.into()
    })
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, &mut app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Tab => app.next_focus(),
                    KeyCode::Char('j') | KeyCode::Down => app.next(),
                    KeyCode::Char('k') | KeyCode::Up => app.previous(),
                    KeyCode::Char('l') | KeyCode::Right => app.next_color(),
                    KeyCode::Char('h') | KeyCode::Left => app.previous_color(),
                    _ => {}
                }
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rects = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(9),
        Constraint::Length(3),
    ])
    .split(f.area());

    app.set_colors();

    render_kpis(f, app, rects[0]);

    let main = Layout::horizontal([Constraint::Length(30), Constraint::Min(40)]).split(rects[1]);
    render_selectors(f, app, main[0]);
    render_table(f, app, main[1]);
    render_scrollbar(f, app, main[1]);

    render_panels(f, app, rects[2]);

    render_footer(f, app, rects[3]);
}

fn panel<'b>(title: &'b str, app: &App, focused: bool) -> Block<'b> {
    let border = if focused {
        app.colors.selected_style_fg
    } else {
        app.colors.footer_border_color
    };
    Block::bordered()
        .title(title)
        .border_style(Style::new().fg(border))
        .bg(app.colors.buffer_bg)
}

fn render_kpis(f: &mut Frame, app: &App, area: Rect) {
    let m = &app.metrics;
    let cards = [
        ("Taxa de Evasão Instituição", data::fmt_rate(m.institution.rate)),
        ("Taxa de Evasão Modalidade", data::fmt_rate(m.modality.rate)),
        ("Taxa de Evasão Curso", data::fmt_rate(m.course.rate)),
        ("Curso com Maior Evasão", m.extremes.max.course.clone()),
        ("Curso com Menor Evasão", m.extremes.min.course.clone()),
    ];
    let areas = Layout::horizontal([Constraint::Ratio(1, 5); 5]).split(area);
    for ((title, value), rect) in cards.into_iter().zip(areas.iter()) {
        let p = Paragraph::new(Line::from(value).bold())
            .style(Style::new().fg(app.colors.row_fg))
            .centered()
            .block(panel(title, app, false));
        f.render_widget(p, *rect);
    }
}

fn render_selectors(f: &mut Frame, app: &mut App, area: Rect) {
    let rects =
        Layout::vertical([Constraint::Percentage(35), Constraint::Percentage(65)]).split(area);
    let selected_style = Style::default()
        .add_modifier(Modifier::REVERSED)
        .fg(app.colors.selected_style_fg);

    let modalities = List::new(app.modalities.iter().map(|m| ListItem::new(m.as_str())))
        .style(Style::new().fg(app.colors.row_fg))
        .highlight_style(selected_style)
        .highlight_symbol("> ")
        .block(panel("Modalidade", app, app.focus == Focus::Modality));
    f.render_stateful_widget(modalities, rects[0], &mut app.modality_state);

    let courses = List::new(app.courses.iter().map(|c| ListItem::new(c.as_str())))
        .style(Style::new().fg(app.colors.row_fg))
        .highlight_style(selected_style)
        .highlight_symbol("> ")
        .block(panel("Curso", app, app.focus == Focus::Course));
    f.render_stateful_widget(courses, rects[1], &mut app.course_state);
}

fn render_table(f: &mut Frame, app: &mut App, area: Rect) {
    let header_style = Style::default()
        .fg(app.colors.header_fg)
        .bg(app.colors.header_bg);
    let selected_style = Style::default()
        .add_modifier(Modifier::REVERSED)
        .fg(app.colors.selected_style_fg);

    let header = CourseRow::HEADER
        .into_iter()
        .map(Cell::from)
        .collect::<Row>()
        .style(header_style)
        .height(1);
    let highlight = app.metrics.highlight.as_str();
    let rows = app.items.iter().enumerate().map(|(i, data)| {
        let color = if data.course() == highlight {
            app.colors.highlight_row_bg
        } else {
            match i % 2 {
                0 => app.colors.normal_row_color,
                _ => app.colors.alt_row_color,
            }
        };
        let item = data.ref_array();
        item.into_iter()
            .map(|content| Cell::from(Text::from(content.as_str())))
            .collect::<Row>()
            .style(Style::new().fg(app.colors.row_fg).bg(color))
            .height(ITEM_HEIGHT as u16)
    });
    let bar = " █ ";
    let widths = app
        .longest_item_lens
        .iter()
        .enumerate()
        .map(|(i, len)| {
            let header_len = CourseRow::HEADER[i].width() as u16;
            // + 1 is for padding.
            Constraint::Min((*len).max(header_len) + 1)
        })
        .collect::<Vec<_>>();
    let t = Table::new(rows, widths)
        .header(header)
        .block(panel(
            "Taxa de Evasão por Curso",
            app,
            app.focus == Focus::Table,
        ))
        .highlight_style(selected_style)
        .highlight_symbol(Text::from(bar))
        .bg(app.colors.buffer_bg)
        .highlight_spacing(HighlightSpacing::Always);
    f.render_stateful_widget(t, area, &mut app.state);
}

fn constraint_len_calculator(items: &[CourseRow]) -> [u16; 7] {
    let mut lens = [0u16; 7];
    for item in items {
        for (i, content) in item.ref_array().into_iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let width = content
                .lines()
                .map(UnicodeWidthStr::width)
                .max()
                .unwrap_or(0) as u16;
            lens[i] = lens[i].max(width);
        }
    }
    lens
}

fn render_scrollbar(f: &mut Frame, app: &mut App, area: Rect) {
    f.render_stateful_widget(
        Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None),
        area.inner(Margin {
            vertical: 1,
            horizontal: 1,
        }),
        &mut app.scroll_state,
    );
}

fn lines_or_empty(lines: Vec<String>) -> Text<'static> {
    if lines.is_empty() {
        return Text::from("sem dados");
    }
    Text::from(lines.into_iter().map(Line::from).collect::<Vec<_>>())
}

fn render_panels(f: &mut Frame, app: &App, area: Rect) {
    let m = &app.metrics;
    let breakdown = |category| {
        m.breakdown(category)
            .map(data::breakdown_lines)
            .unwrap_or_default()
    };
    let panels = [
        ("Evasão por Gênero", breakdown(Category::Gender)),
        ("Evasão por Raça", breakdown(Category::Race)),
        ("Forma de Acesso", breakdown(Category::SelectiveAccess)),
        (
            "Reprovações dos Evadidos",
            data::bucket_lines(&m.distributions.failures),
        ),
        (
            "Frequência dos Evadidos (%)",
            data::bucket_lines(&m.distributions.attendance),
        ),
    ];
    let areas = Layout::horizontal([Constraint::Ratio(1, 5); 5]).split(area);
    for ((title, lines), rect) in panels.into_iter().zip(areas.iter()) {
        let p = Paragraph::new(lines_or_empty(lines))
            .style(Style::new().fg(app.colors.row_fg))
            .block(panel(title, app, false));
        f.render_widget(p, *rect);
    }
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let reference = format!(
        "IRA médio da instituição: {} | Taxa de evasão da instituição: {}",
        data::fmt_opt(app.metrics.institution_academic_index),
        data::fmt_rate(app.metrics.institution.rate),
    );
    let mut spans = vec![Span::styled(
        reference,
        Style::new().fg(app.colors.reference_fg),
    )];
    match &app.message {
        Some(message) => spans.push(Span::raw(format!(" | {}", message))),
        None => spans.push(Span::raw(format!(" | {}", INFO_TEXT))),
    }
    let info_footer = Paragraph::new(Line::from(spans))
        .style(Style::new().fg(app.colors.row_fg).bg(app.colors.buffer_bg))
        .centered()
        .block(
            Block::bordered()
                .border_type(BorderType::Double)
                .border_style(Style::new().fg(app.colors.footer_border_color)),
        );
    f.render_widget(info_footer, area);
}
