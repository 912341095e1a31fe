use bitflags::bitflags;
use std::sync::{Arc, Condvar, Mutex};

bitflags! {
    /// The set of hex keys currently held down.
    pub struct Keys: u16 {
        const KEY_0 = 1 << 0x0;
        const KEY_1 = 1 << 0x1;
        const KEY_2 = 1 << 0x2;
        const KEY_3 = 1 << 0x3;
        const KEY_4 = 1 << 0x4;
        const KEY_5 = 1 << 0x5;
        const KEY_6 = 1 << 0x6;
        const KEY_7 = 1 << 0x7;
        const KEY_8 = 1 << 0x8;
        const KEY_9 = 1 << 0x9;
        const KEY_A = 1 << 0xA;
        const KEY_B = 1 << 0xB;
        const KEY_C = 1 << 0xC;
        const KEY_D = 1 << 0xD;
        const KEY_E = 1 << 0xE;
        const KEY_F = 1 << 0xF;
    }
}

impl Keys {
    /// The single-key set for a key code, empty for codes above 0xF.
    pub fn key(code: u8) -> Keys {
        if code > 0xF {
            Keys::empty()
        } else {
            Keys::from_bits_truncate(1 << code)
        }
    }

    pub fn is_down(&self, code: u8) -> bool {
        let key = Keys::key(code);
        !key.is_empty() && self.contains(key)
    }
}

impl Default for Keys {
    fn default() -> Self {
        Keys::empty()
    }
}

/// Where the machine reads its 16 key hex keypad from.
pub trait Keypad {
    /// Keys held down right now.
    fn pressed(&self) -> Keys;

    /// Blocks until the next key press and returns its code (0..=0xF).
    /// `None` means no further key presses will arrive.
    fn wait_for_press(&mut self) -> Option<u8>;
}

/// A keypad nobody presses. Waiting on it fails immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullKeypad;

impl Keypad for NullKeypad {
    fn pressed(&self) -> Keys {
        Keys::empty()
    }

    fn wait_for_press(&mut self) -> Option<u8> {
        None
    }
}

#[derive(Debug, Default)]
struct KeyState {
    down: Keys,
    presses: u64,
    last_press: u8,
    closed: bool,
}

/// Thread-safe keypad shared between a front end, which calls `press`
/// and `release`, and the machine reading it.
#[derive(Clone, Debug, Default)]
pub struct SharedKeypad {
    state: Arc<(Mutex<KeyState>, Condvar)>,
}

impl SharedKeypad {
    pub fn new() -> SharedKeypad {
        SharedKeypad::default()
    }

    pub fn press(&self, code: u8) {
        if code > 0xF {
            return;
        }
        let (mutex, condvar) = &*self.state;
        let mut state = lock(mutex);
        state.down.insert(Keys::key(code));
        state.presses += 1;
        state.last_press = code;
        condvar.notify_all();
    }

    pub fn release(&self, code: u8) {
        let (mutex, _) = &*self.state;
        lock(mutex).down.remove(Keys::key(code));
    }

    /// Wakes every waiter with `None`; later waits return `None` immediately.
    pub fn close(&self) {
        let (mutex, condvar) = &*self.state;
        lock(mutex).closed = true;
        condvar.notify_all();
    }
}

impl Keypad for SharedKeypad {
    fn pressed(&self) -> Keys {
        let (mutex, _) = &*self.state;
        lock(mutex).down
    }

    fn wait_for_press(&mut self) -> Option<u8> {
        let (mutex, condvar) = &*self.state;
        let mut state = lock(mutex);
        let seen = state.presses;
        loop {
            if state.closed {
                return None;
            }
            if state.presses != seen {
                return Some(state.last_press);
            }
            state = match condvar.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}

// A panic on another thread cannot leave a key set half written.
fn lock(mutex: &Mutex<KeyState>) -> std::sync::MutexGuard<'_, KeyState> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
