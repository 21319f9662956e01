//! Key routing: canonical keys to view actions and list commands.
//!
//! Resolution is deterministic: an open help overlay takes precedence over
//! the view's own bindings, then the per-view table applies.

#![allow(missing_docs)]

use std::fmt;

use crate::tui::keys::Key;
use crate::tui::list::{NavigableList, PAGE_JUMP};

/// Which view owns the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Scanner,
    Selector,
    Attack,
}

impl ViewKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scanner => "scanner",
            Self::Selector => "selector",
            Self::Attack => "attack",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the surrounding program should do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewAction {
    Confirm,
    Quit,
    Help,
    #[default]
    None,
}

impl ViewAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Quit => "quit",
            Self::Help => "help",
            Self::None => "none",
        }
    }
}

/// Cursor and selection edits on a [`NavigableList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListCommand {
    Move(isize),
    Home,
    End,
    ToggleCursor,
    SelectAll,
    SelectNone,
}

impl ListCommand {
    pub fn apply<T>(self, list: &mut NavigableList<T>) {
        match self {
            Self::Move(delta) => list.move_cursor(delta),
            Self::Home => list.home(),
            Self::End => list.end(),
            Self::ToggleCursor => list.toggle_cursor(),
            Self::SelectAll => list.select_all(),
            Self::SelectNone => list.select_none(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputContext {
    pub view: ViewKind,
    pub help_open: bool,
}

impl InputContext {
    pub const fn new(view: ViewKind) -> Self {
        Self {
            view,
            help_open: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputResolution {
    pub action: ViewAction,
    pub command: Option<ListCommand>,
    /// The key dismissed an open help overlay.
    pub dismiss_help: bool,
}

impl InputResolution {
    const fn action(action: ViewAction) -> Self {
        Self {
            action,
            command: None,
            dismiss_help: false,
        }
    }

    const fn command(command: ListCommand) -> Self {
        Self {
            action: ViewAction::None,
            command: Some(command),
            dismiss_help: false,
        }
    }

    const fn dismiss() -> Self {
        Self {
            action: ViewAction::None,
            command: None,
            dismiss_help: true,
        }
    }

    const fn ignored() -> Self {
        Self::action(ViewAction::None)
    }
}

/// Resolve one key for the given context.
#[must_use]
pub fn resolve_key(key: Key, context: InputContext) -> InputResolution {
    if context.help_open {
        // Ctrl+C keeps its meaning so an interrupt is never swallowed.
        if key == Key::CtrlC {
            let mut resolution = resolve_view_key(key, context.view);
            resolution.dismiss_help = true;
            return resolution;
        }
        return InputResolution::dismiss();
    }
    resolve_view_key(key, context.view)
}

fn resolve_view_key(key: Key, view: ViewKind) -> InputResolution {
    match view {
        ViewKind::Selector => resolve_selector_key(key),
        ViewKind::Scanner => match key {
            Key::Char('?') => InputResolution::action(ViewAction::Help),
            Key::CtrlC => InputResolution::action(ViewAction::Confirm),
            Key::Char('q') => InputResolution::action(ViewAction::Quit),
            _ => InputResolution::ignored(),
        },
        ViewKind::Attack => match key {
            Key::Char('?') => InputResolution::action(ViewAction::Help),
            Key::CtrlC => InputResolution::action(ViewAction::Quit),
            _ => InputResolution::ignored(),
        },
    }
}

fn resolve_selector_key(key: Key) -> InputResolution {
    match key {
        Key::Up => InputResolution::command(ListCommand::Move(-1)),
        Key::Down => InputResolution::command(ListCommand::Move(1)),
        Key::PageUp => InputResolution::command(ListCommand::Move(-PAGE_JUMP)),
        Key::PageDown => InputResolution::command(ListCommand::Move(PAGE_JUMP)),
        Key::Home => InputResolution::command(ListCommand::Home),
        Key::End => InputResolution::command(ListCommand::End),
        Key::Space => InputResolution::command(ListCommand::ToggleCursor),
        Key::Char('a' | 'A') => InputResolution::command(ListCommand::SelectAll),
        Key::Char('n' | 'N') => InputResolution::command(ListCommand::SelectNone),
        Key::Enter => InputResolution::action(ViewAction::Confirm),
        Key::Char('q' | 'Q') | Key::CtrlC => InputResolution::action(ViewAction::Quit),
        Key::Char('?') => InputResolution::action(ViewAction::Help),
        _ => InputResolution::ignored(),
    }
}

// ──────────────────── help catalog ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpBinding {
    pub keys: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextualHelp {
    pub title: &'static str,
    pub bindings: Vec<HelpBinding>,
}

const GENERAL_BINDINGS: [HelpBinding; 2] = [
    HelpBinding {
        keys: "?",
        description: "Show this help",
    },
    HelpBinding {
        keys: "any key",
        description: "Dismiss help",
    },
];

const SCANNER_BINDINGS: [HelpBinding; 2] = [
    HelpBinding {
        keys: "Ctrl+C",
        description: "Stop scanning and select targets",
    },
    HelpBinding {
        keys: "q",
        description: "Quit",
    },
];

const SELECTOR_BINDINGS: [HelpBinding; 8] = [
    HelpBinding {
        keys: "↑ / ↓",
        description: "Navigate up/down",
    },
    HelpBinding {
        keys: "PgUp / PgDn",
        description: "Jump ten rows",
    },
    HelpBinding {
        keys: "Home / End",
        description: "First / last target",
    },
    HelpBinding {
        keys: "Space",
        description: "Toggle selection",
    },
    HelpBinding {
        keys: "Enter",
        description: "Confirm selection and start attack",
    },
    HelpBinding {
        keys: "a",
        description: "Select all targets",
    },
    HelpBinding {
        keys: "n",
        description: "Select none",
    },
    HelpBinding {
        keys: "q / Ctrl+C",
        description: "Quit without selecting",
    },
];

const ATTACK_BINDINGS: [HelpBinding; 1] = [HelpBinding {
    keys: "Ctrl+C",
    description: "Interrupt attack",
}];

/// Bindings shown by the help overlay of `view`.
#[must_use]
pub fn contextual_help(view: ViewKind) -> ContextualHelp {
    let specific: &[HelpBinding] = match view {
        ViewKind::Scanner => &SCANNER_BINDINGS,
        ViewKind::Selector => &SELECTOR_BINDINGS,
        ViewKind::Attack => &ATTACK_BINDINGS,
    };
    let mut bindings = Vec::with_capacity(GENERAL_BINDINGS.len() + specific.len());
    bindings.extend_from_slice(&GENERAL_BINDINGS);
    bindings.extend_from_slice(specific);
    ContextualHelp {
        title: "Keyboard Shortcuts",
        bindings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> InputContext {
        InputContext::new(ViewKind::Selector)
    }

    #[test]
    fn selector_navigation_keys() {
        let ctx = selector();
        assert_eq!(resolve_key(Key::Up, ctx).command, Some(ListCommand::Move(-1)));
        assert_eq!(resolve_key(Key::PageDown, ctx).command, Some(ListCommand::Move(10)));
        assert_eq!(resolve_key(Key::Space, ctx).command, Some(ListCommand::ToggleCursor));
        assert_eq!(resolve_key(Key::Char('A'), ctx).command, Some(ListCommand::SelectAll));
        assert_eq!(resolve_key(Key::Char('n'), ctx).command, Some(ListCommand::SelectNone));
        assert_eq!(resolve_key(Key::Enter, ctx).action, ViewAction::Confirm);
        assert_eq!(resolve_key(Key::Char('Q'), ctx).action, ViewAction::Quit);
        assert_eq!(resolve_key(Key::CtrlC, ctx).action, ViewAction::Quit);
        assert_eq!(resolve_key(Key::Unknown, ctx), InputResolution::ignored());
    }

    #[test]
    fn scanner_and_attack_ctrl_c_differ() {
        let scanner = InputContext::new(ViewKind::Scanner);
        let attack = InputContext::new(ViewKind::Attack);
        assert_eq!(resolve_key(Key::CtrlC, scanner).action, ViewAction::Confirm);
        assert_eq!(resolve_key(Key::CtrlC, attack).action, ViewAction::Quit);
        assert_eq!(resolve_key(Key::Char('?'), attack).action, ViewAction::Help);
        assert_eq!(resolve_key(Key::Char('q'), attack).action, ViewAction::None);
        assert_eq!(resolve_key(Key::Up, scanner).command, None);
    }

    #[test]
    fn open_help_swallows_next_key() {
        let ctx = InputContext {
            view: ViewKind::Selector,
            help_open: true,
        };
        let r = resolve_key(Key::Char('q'), ctx);
        assert!(r.dismiss_help);
        assert_eq!(r.action, ViewAction::None);
        assert!(r.command.is_none());

        let r = resolve_key(Key::CtrlC, ctx);
        assert!(r.dismiss_help);
        assert_eq!(r.action, ViewAction::Quit);
    }

    #[test]
    fn list_commands_edit_list() {
        let mut list = NavigableList::new((0..30).collect::<Vec<u32>>(), 10);
        ListCommand::Move(15).apply(&mut list);
        assert_eq!(list.cursor(), 15);
        ListCommand::ToggleCursor.apply(&mut list);
        assert!(list.is_selected(15));
        ListCommand::End.apply(&mut list);
        assert_eq!(list.cursor(), 29);
        ListCommand::SelectAll.apply(&mut list);
        assert_eq!(list.selected_count(), 30);
        ListCommand::SelectNone.apply(&mut list);
        ListCommand::Home.apply(&mut list);
        assert_eq!((list.cursor(), list.selected_count()), (0, 0));
    }

    #[test]
    fn help_catalog_is_view_specific() {
        let selector = contextual_help(ViewKind::Selector);
        assert!(selector.bindings.iter().any(|b| b.keys == "Space"));
        let scanner = contextual_help(ViewKind::Scanner);
        assert!(scanner.bindings.iter().any(|b| b.description.contains("Stop scanning")));
        assert!(!scanner.bindings.iter().any(|b| b.keys == "Space"));
    }
}
