//! Terminal status line standing in for an editor status bar item

use devlens_core::{StatusAppearance, StatusBar, StatusBarItem};

use crate::output;

/// Renders status items as styled lines on stderr.
pub struct TerminalStatusBar;

impl StatusBar for TerminalStatusBar {
    fn create(&self) -> Box<dyn StatusBarItem> {
        Box::new(TerminalStatusItem::default())
    }
}

#[derive(Default)]
struct TerminalStatusItem {
    visible: bool,
    current: Option<StatusAppearance>,
}

impl TerminalStatusItem {
    fn render(&self) {
        if !self.visible {
            return;
        }
        if let Some(appearance) = &self.current {
            eprintln!("{}", render_line(appearance));
        }
    }
}

impl StatusBarItem for TerminalStatusItem {
    fn show(&mut self) {
        if !self.visible {
            self.visible = true;
            self.render();
        }
    }

    fn update(&mut self, appearance: &StatusAppearance) {
        if self.current.as_ref() == Some(appearance) {
            return;
        }
        self.current = Some(appearance.clone());
        self.render();
    }

    fn dispose(self: Box<Self>) {}
}

pub(crate) fn render_line(appearance: &StatusAppearance) -> String {
    let text = output::named_color(&appearance.text, appearance.color.as_deref()).bold();
    let mut line = text.to_string();
    if let Some(tooltip) = &appearance.tooltip {
        line.push_str(&format!("  {}", output::brand_muted(tooltip)));
    }
    if output::is_verbose()
        && let Some(command) = &appearance.command
    {
        line.push_str(&format!(" {}", output::brand_muted(format!("[{command}]"))));
    }
    line
}
