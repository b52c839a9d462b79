use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, ModifierKeyCode};

/// Key names that never reach the typing session on their own
pub const IGNORED_CONTROL_KEYS: [&str; 5] = ["Shift", "CapsLock", "Control", "Alt", "Meta"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Tab,
    /// Any other named key, or composed input that produced more than one character
    Named(String),
}

impl Key {
    /// Build a key from a browser-style key name ("a", "Backspace", "Shift", ...)
    pub fn from_name(name: &str) -> Self {
        match name {
            "Backspace" => Key::Backspace,
            "Tab" => Key::Tab,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => Key::Named(name.to_string()),
                }
            }
        }
    }

    pub fn is_ignored_control(&self) -> bool {
        matches!(self, Key::Named(name) if IGNORED_CONTROL_KEYS.contains(&name.as_str()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        meta: false,
        shift: false,
    };

    /// Ctrl/Alt/Meta chords belong to the OS and the app shell, not the quote
    pub fn is_reserved(self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(m: KeyModifiers) -> Self {
        Self {
            ctrl: m.contains(KeyModifiers::CONTROL),
            alt: m.contains(KeyModifiers::ALT),
            meta: m.intersects(KeyModifiers::META | KeyModifiers::SUPER),
            shift: m.contains(KeyModifiers::SHIFT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    pub fn char(c: char) -> Self {
        Self::plain(Key::Char(c))
    }

    pub fn named(name: &str) -> Self {
        Self::plain(Key::from_name(name))
    }
}

fn modifier_key_name(code: ModifierKeyCode) -> &'static str {
    match code {
        ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => "Control",
        ModifierKeyCode::LeftAlt | ModifierKeyCode::RightAlt => "Alt",
        ModifierKeyCode::LeftSuper
        | ModifierKeyCode::RightSuper
        | ModifierKeyCode::LeftMeta
        | ModifierKeyCode::RightMeta
        | ModifierKeyCode::LeftHyper
        | ModifierKeyCode::RightHyper => "Meta",
        ModifierKeyCode::LeftShift
        | ModifierKeyCode::RightShift
        | ModifierKeyCode::IsoLevel3Shift
        | ModifierKeyCode::IsoLevel5Shift => "Shift",
    }
}

impl From<KeyEvent> for KeyPress {
    fn from(event: KeyEvent) -> Self {
        let key = match event.code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Tab | KeyCode::BackTab => Key::Tab,
            KeyCode::CapsLock => Key::Named("CapsLock".to_string()),
            KeyCode::Modifier(code) => Key::Named(modifier_key_name(code).to_string()),
            other => Key::Named(format!("{other:?}")),
        };
        Self::new(key, event.modifiers.into())
    }
}

/// What a key press means to a typing session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Ignore,
    NextBook,
    Backspace,
    Type(char),
}

pub fn classify(press: &KeyPress) -> KeyAction {
    if press.modifiers.is_reserved() {
        return KeyAction::Ignore;
    }

    match &press.key {
        Key::Tab => KeyAction::NextBook,
        Key::Backspace => KeyAction::Backspace,
        Key::Char(c) if !c.is_control() => KeyAction::Type(*c),
        Key::Char(_) | Key::Named(_) => KeyAction::Ignore,
    }
}
