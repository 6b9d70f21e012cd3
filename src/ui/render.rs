//! 界面渲染
//!
//! 根据 UiState 绘制：标题栏显示阶段与连通状态，左栏为编辑器或归档列表，
//! 右栏为报告（按已揭示前缀渲染），底部为状态/错误行与快捷键提示。
//! 错误文本与瞬态状态用不同样式区分。

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::core::{Liveness, SessionPhase, Tab, UiState};

/// 归档行里代码预览的最大字符数
const MAX_PREVIEW_CHARS: usize = 48;

/// 预览截断（按字符数，避免在 UTF-8 中间截断）
fn preview(code: &str) -> String {
    let one_line = code.replace('\n', " ");
    let chars: Vec<char> = one_line.chars().collect();
    if chars.len() <= MAX_PREVIEW_CHARS {
        return one_line;
    }
    let head: String = chars.iter().take(MAX_PREVIEW_CHARS).collect();
    format!("{}…", head)
}

fn phase_label(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Idle => "空闲",
        SessionPhase::Analyzing => "分析中…",
        SessionPhase::Revealing => "输出中…",
        SessionPhase::Error => "错误",
    }
}

fn liveness_span(liveness: Liveness) -> Span<'static> {
    match liveness {
        Liveness::Online => Span::styled("● Core Online", Style::default().fg(Color::Green)),
        Liveness::Offline => Span::styled("○ Connecting...", Style::default().fg(Color::Red)),
        Liveness::Unknown => Span::styled("… Linking...", Style::default().fg(Color::DarkGray)),
    }
}

/// 绘制一帧：标题栏、左右主区、底部状态与快捷键提示
pub fn draw(
    f: &mut Frame,
    state: &UiState,
    input_buffer: &str,
    archive_cursor: usize,
    report_scroll: u16,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(2),
        ])
        .split(f.area());

    // 标题栏
    let header = Line::from(vec![
        Span::styled(
            " CodeGuard ",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("│ "),
        Span::raw(phase_label(state.phase)),
        Span::raw("  "),
        liveness_span(state.liveness),
    ]);
    f.render_widget(
        Paragraph::new(header).block(Block::default().borders(Borders::ALL)),
        chunks[0],
    );

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    match state.tab {
        Tab::Audit => draw_editor(f, state, input_buffer, main[0]),
        Tab::Archive => draw_archive(f, state, archive_cursor, main[0]),
    }
    draw_report(f, state, report_scroll, main[1]);

    // 底部：状态/错误行 + 快捷键提示
    let status_line = if let Some(err) = &state.error_message {
        Line::from(Span::styled(
            format!("SYSTEM ERROR: {}", err),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
    } else if let Some(status) = &state.status {
        Line::from(Span::styled(
            status.clone(),
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from("")
    };
    let hints = Line::from(Span::styled(
        " Tab 切换页签 │ Enter 提交/选中 │ Alt+Enter 换行 │ Ctrl+R 刷新归档 │ Ctrl+L 清空 │ Ctrl+Q 退出",
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(Paragraph::new(Text::from(vec![status_line, hints])), chunks[2]);
}

/// 左栏（审计页签）：代码编辑器
fn draw_editor(f: &mut Frame, state: &UiState, input_buffer: &str, area: ratatui::layout::Rect) {
    let title = if state.input_locked {
        " Source Terminal (locked) "
    } else {
        " Source Terminal "
    };
    let style = if state.input_locked {
        Style::default().add_modifier(Modifier::DIM)
    } else {
        Style::default()
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    f.render_widget(
        Paragraph::new(input_buffer.to_string())
            .style(style)
            .block(block)
            .wrap(Wrap { trim: false }),
        area,
    );
}

/// 左栏（归档页签）：历史记录列表；编号方向由 newest_first 决定
fn draw_archive(f: &mut Frame, state: &UiState, archive_cursor: usize, area: ratatui::layout::Rect) {
    let block = Block::default()
        .title(" Archive Database ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    if state.loading_history {
        f.render_widget(
            Paragraph::new("Loading…")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        );
        return;
    }
    if state.history.is_empty() {
        f.render_widget(
            Paragraph::new("Void Log")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        );
        return;
    }

    let total = state.history.len();
    let mut lines: Vec<Line> = Vec::new();
    for (idx, record) in state.history.iter().enumerate() {
        let number = if state.newest_first { total - idx } else { idx + 1 };
        let style = if idx == archive_cursor {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("Record Entry #{:<3}", number), style.add_modifier(Modifier::BOLD)),
            Span::styled(
                format!(" {} ", record.timestamp.format("%Y-%m-%d")),
                style.fg(Color::DarkGray),
            ),
            Span::styled(preview(&record.source_code), style.fg(Color::Gray)),
        ]));
    }
    f.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

/// 右栏：审计报告，按已揭示的前缀渲染（打字机效果）
fn draw_report(f: &mut Frame, state: &UiState, report_scroll: u16, area: ratatui::layout::Rect) {
    let mut title_spans = vec![Span::raw(" Intel Analysis ")];
    if let Some(report) = &state.report {
        if report.is_complete() && !report.full_text.is_empty() {
            title_spans.push(Span::styled(
                "✔ Signed ",
                Style::default().fg(Color::Green),
            ));
        }
    }
    let block = Block::default()
        .title(Line::from(title_spans))
        .borders(Borders::ALL);

    match &state.report {
        Some(report) => {
            f.render_widget(
                Paragraph::new(report.visible_text().to_string())
                    .block(block)
                    .wrap(Wrap { trim: false })
                    .scroll((report_scroll, 0)),
                area,
            );
        }
        None => {
            f.render_widget(
                Paragraph::new("System Standby")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::DarkGray))
                    .block(block),
                area,
            );
        }
    }
}
