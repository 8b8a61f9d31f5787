//! Frame layout and widgets for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use crate::Condition;
use crate::word::as_signed;
use super::app::DebuggerApp;

const HELP: [&str; 3] = [
    "s step  r run  p pause  b breakpoint",
    "x reset  i input (Esc ends)  q quit",
    "↑/↓ PgUp/PgDn scroll memory",
];

/// Render one frame.
///
/// ```text
/// +--------------------+-------------+
/// | registers          | memory      |
/// +--------------------+             |
/// | disassembly        |             |
/// |                    +-------------+
/// |                    | output      |
/// +--------------------+-------------+
/// | status                   | help  |
/// +--------------------------+-------+
/// ```
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let [body, footer] = Layout::vertical([Constraint::Min(12), Constraint::Length(5)])
        .areas(frame.area());
    let [left, right] = Layout::horizontal([Constraint::Percentage(58), Constraint::Percentage(42)])
        .areas(body);
    let [registers, code] = Layout::vertical([Constraint::Length(7), Constraint::Min(5)])
        .areas(left);
    let [memory, output] = Layout::vertical([Constraint::Min(6), Constraint::Length(10)])
        .areas(right);
    let [status, help] = Layout::horizontal([Constraint::Min(20), Constraint::Length(40)])
        .areas(footer);

    render_registers(frame, registers, app);
    render_code(frame, code, app);
    render_memory(frame, memory, app);
    render_output(frame, output, app);
    render_status(frame, status, app);
    frame.render_widget(
        Paragraph::new(HELP.iter().map(|l| Line::from(*l)).collect::<Vec<_>>())
            .style(Style::default().fg(Color::DarkGray))
            .block(panel(" Keys ", Color::DarkGray)),
        help,
    );
}

fn panel(title: &str, color: Color) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

/// Rows available inside a bordered panel.
fn inner_rows(area: Rect) -> usize {
    area.height.saturating_sub(2) as usize
}

fn render_code(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let rows: Vec<ListItem> = app
        .get_disassembly(inner_rows(area))
        .into_iter()
        .map(|(addr, text, at_pc)| {
            let has_bp = app.breakpoints.contains(&addr);
            let marker = match (has_bp, at_pc) {
                (true, true) => "●▶",
                (true, false) => "● ",
                (false, true) => " ▶",
                (false, false) => "  ",
            };
            let style = if at_pc {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if has_bp {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            ListItem::new(format!("{} x{:04X}  {}", marker, addr, text)).style(style)
        })
        .collect();

    frame.render_widget(List::new(rows).block(panel(" Code ", Color::Cyan)), area);
}

fn render_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.cpu.regs;
    let gpr = |i: u8| -> [Span<'static>; 2] {
        let value = regs.get(i);
        [
            Span::styled(format!("R{} x{:04X}", i, value), Style::default().fg(Color::White)),
            Span::styled(format!(" {:>6}   ", as_signed(value)), Style::default().fg(Color::DarkGray)),
        ]
    };

    let mut lines: Vec<Line> = (0..4u8)
        .map(|i| Line::from_iter(gpr(i).into_iter().chain(gpr(i + 4))))
        .collect();

    let state_color = if app.cpu.is_running() { Color::Green } else { Color::Red };
    lines.push(Line::from(vec![
        Span::styled(format!("PC x{:04X}", regs.pc), Style::default().fg(Color::Yellow)),
        Span::raw("  CC "),
        Span::styled(regs.cond.to_string(), cond_style(regs.cond)),
        Span::raw(format!("  {} cycles  ", app.cpu.cycles)),
        Span::styled(format!("{:?}", app.cpu.state), Style::default().fg(state_color)),
    ]));

    frame.render_widget(Paragraph::new(lines).block(panel(" Registers ", Color::Green)), area);
}

/// Memory rows come from `peek`, so drawing never touches the keyboard.
fn render_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let pc = app.cpu.regs.pc;
    let rows: Vec<ListItem> = app
        .cpu
        .mem
        .dump(app.mem_scroll, inner_rows(area))
        .into_iter()
        .map(|(addr, value)| {
            let style = match (addr == pc, value) {
                (true, _) => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                (false, 0) => Style::default().fg(Color::DarkGray),
                _ => Style::default().fg(Color::White),
            };
            ListItem::new(format!("x{:04X}  x{:04X} {:>6}", addr, value, as_signed(value))).style(style)
        })
        .collect();

    frame.render_widget(List::new(rows).block(panel(" Memory ", Color::Magenta)), area);
}

fn render_output(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let lines: Vec<&str> = app.transcript.lines().collect();
    let shown = lines[lines.len().saturating_sub(inner_rows(area))..].join("\n");

    let block = if app.input_mode {
        panel(" Output [typing] ", Color::Yellow)
    } else {
        panel(" Output ", Color::Blue)
    };
    frame.render_widget(Paragraph::new(shown).wrap(Wrap { trim: false }).block(block), area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    frame.render_widget(
        Paragraph::new(app.status.as_str())
            .wrap(Wrap { trim: true })
            .block(panel(" Status ", Color::White)),
        area,
    );
}

fn cond_style(cond: Condition) -> Style {
    let color = match cond {
        Condition::Negative => Color::Red,
        Condition::Zero => Color::Gray,
        Condition::Positive => Color::Green,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}
