use serde::{Deserialize, Serialize};
use std::fmt;

/// The six inputs the controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Shoot,
    Bomb,
}

impl Key {
    pub const ALL: [Key; 6] = [Key::Left, Key::Right, Key::Up, Key::Down, Key::Shoot, Key::Bomb];
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Key::Left => "left",
            Key::Right => "right",
            Key::Up => "up",
            Key::Down => "down",
            Key::Shoot => "shoot",
            Key::Bomb => "bomb",
        };
        f.write_str(name)
    }
}

/// Hardware scan codes the platform sink emits for each [`Key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub left: u16,
    pub right: u16,
    pub up: u16,
    pub down: u16,
    pub shoot: u16,
    pub bomb: u16,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            left: 0x4B,
            right: 0x4D,
            up: 0x48,
            down: 0x50,
            shoot: 0x2C, // Z
            bomb: 0x2D,  // X
        }
    }
}

impl KeyBindings {
    pub fn scan_code(&self, key: Key) -> u16 {
        match key {
            Key::Left => self.left,
            Key::Right => self.right,
            Key::Up => self.up,
            Key::Down => self.down,
            Key::Shoot => self.shoot,
            Key::Bomb => self.bomb,
        }
    }

    /// Reverse lookup. The first key bound to `code` wins.
    pub fn key_for(&self, code: u16) -> Option<Key> {
        Key::ALL.into_iter().find(|&key| self.scan_code(key) == code)
    }
}

/// One press or release sent to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCommand {
    pub key: Key,
    pub pressed: bool,
}

/// Fire-and-forget key input. Repeated presses of a held key are a no-op continuation.
pub trait KeySink {
    fn press(&mut self, key: Key);
    fn release(&mut self, key: Key);
}

/// Records commands in order; handy for dry runs and tests.
impl KeySink for Vec<KeyCommand> {
    fn press(&mut self, key: Key) {
        self.push(KeyCommand { key, pressed: true });
    }

    fn release(&mut self, key: Key) {
        self.push(KeyCommand { key, pressed: false });
    }
}

/// Translates keys to scan codes and hands them to a platform emitter
/// as `(code, pressed)`.
pub struct ScanCodeSink<F> {
    bindings: KeyBindings,
    emit: F,
}

impl<F: FnMut(u16, bool)> ScanCodeSink<F> {
    pub fn new(bindings: KeyBindings, emit: F) -> Self {
        Self { bindings, emit }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }
}

impl<F: FnMut(u16, bool)> KeySink for ScanCodeSink<F> {
    fn press(&mut self, key: Key) {
        (self.emit)(self.bindings.scan_code(key), true);
    }

    fn release(&mut self, key: Key) {
        (self.emit)(self.bindings.scan_code(key), false);
    }
}

impl<K: KeySink + ?Sized> KeySink for &mut K {
    fn press(&mut self, key: Key) {
        (**self).press(key);
    }

    fn release(&mut self, key: Key) {
        (**self).release(key);
    }
}
