//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state_rx 与键盘事件：编辑缓冲与页签/光标在本层维护，
//! 提交、切页、选中记录都转为 Command 发给控制器，每帧用 draw 渲染 UiState。

use std::io::{self, Stdout};

use crossterm::event::KeyCode;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};

use crate::core::{Command, Tab, UiState};
use crate::ui::render::draw;

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    state_rx: watch::Receiver<UiState>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    seed_snippet: String,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let event_handler = super::event::EventHandler::new(cmd_tx.clone());
    let mut input_buffer = seed_snippet;
    let mut archive_cursor = 0usize;
    let mut report_scroll = 0u16;

    loop {
        let state = state_rx.borrow().clone();
        if archive_cursor >= state.history.len() {
            archive_cursor = state.history.len().saturating_sub(1);
        }

        if let Ok(Some(ev)) = event_handler.poll() {
            match ev {
                super::event::AppEvent::Command(cmd) => {
                    if matches!(cmd, Command::Quit) {
                        break;
                    }
                }
                super::event::AppEvent::Key(key) => match key.code {
                    KeyCode::Tab => {
                        // 页签切换；归档切入时控制器恰好触发一次拉取
                        let _ = cmd_tx.send(match state.tab {
                            Tab::Audit => Command::OpenArchive,
                            Tab::Archive => Command::OpenAudit,
                        });
                    }
                    KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
                        if state.tab == Tab::Audit && !state.input_locked {
                            input_buffer.push('\n');
                        }
                    }
                    KeyCode::Enter => match state.tab {
                        Tab::Audit => {
                            if !state.input_locked {
                                let _ = cmd_tx.send(Command::Submit(input_buffer.clone()));
                            }
                        }
                        Tab::Archive => {
                            // 选中记录：报告交给控制器重新展示，代码召回编辑缓冲
                            if let Some(record) = state.history.get(archive_cursor) {
                                input_buffer = record.source_code.clone();
                                let _ = cmd_tx.send(Command::SelectRecord(record.id.clone()));
                            }
                        }
                    },
                    KeyCode::Backspace => {
                        if state.tab == Tab::Audit && !state.input_locked {
                            input_buffer.pop();
                        }
                    }
                    KeyCode::Char(c) => {
                        if state.tab == Tab::Audit && !state.input_locked {
                            input_buffer.push(c);
                        }
                    }
                    KeyCode::Up => match state.tab {
                        Tab::Archive => archive_cursor = archive_cursor.saturating_sub(1),
                        Tab::Audit => report_scroll = report_scroll.saturating_sub(1),
                    },
                    KeyCode::Down => match state.tab {
                        Tab::Archive => {
                            if archive_cursor + 1 < state.history.len() {
                                archive_cursor += 1;
                            }
                        }
                        Tab::Audit => report_scroll = report_scroll.saturating_add(1),
                    },
                    KeyCode::PageUp => report_scroll = report_scroll.saturating_sub(10),
                    KeyCode::PageDown => report_scroll = report_scroll.saturating_add(10),
                    KeyCode::Home => report_scroll = 0,
                    _ => {}
                },
            }
        }

        terminal.draw(|f| {
            draw(f, &state, &input_buffer, archive_cursor, report_scroll);
        })?;

        tokio::task::yield_now().await;
    }

    restore_terminal(&mut terminal)?;
    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
