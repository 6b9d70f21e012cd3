//! 事件处理
//!
//! 轮询 crossterm 键盘事件，将 Ctrl+Q/Ctrl+L/Ctrl+R/Esc 转为 Command
//! （Quit/Clear/RefreshArchive/OpenAudit），其余按键交给 run_app 处理
//! （编辑缓冲、页签切换、归档光标）。

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

use crate::core::Command;

/// 应用事件：来自快捷键的 Command 或原始 KeyEvent
#[derive(Debug, Clone)]
pub enum AppEvent {
    Command(Command),
    Key(KeyEvent),
}

/// 事件处理器：持有 cmd_tx，poll 时读键盘并返回 AppEvent
pub struct EventHandler {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl EventHandler {
    pub fn new(cmd_tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { cmd_tx }
    }

    pub fn poll(&self) -> anyhow::Result<Option<AppEvent>> {
        if event::poll(std::time::Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(self.handle_key(key)));
                }
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: KeyEvent) -> AppEvent {
        match key.code {
            KeyCode::Char('q') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                AppEvent::Command(Command::Quit)
            }
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let _ = self.cmd_tx.send(Command::Clear);
                AppEvent::Command(Command::Clear)
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let _ = self.cmd_tx.send(Command::RefreshArchive);
                AppEvent::Command(Command::RefreshArchive)
            }
            KeyCode::Esc => {
                let _ = self.cmd_tx.send(Command::OpenAudit);
                AppEvent::Command(Command::OpenAudit)
            }
            _ => AppEvent::Key(key),
        }
    }
}
