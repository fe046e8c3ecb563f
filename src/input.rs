//! Keyboard event queue and handler dispatch.
//!
//! Key-down edges are polled off the window into a queue once per frame,
//! then drained through an ordered handler chain. Registration is
//! append-only, like the MMIO registries: the first handler to consume
//! an event stops the chain.

use std::collections::VecDeque;

use minifb::{Key, KeyRepeat, Window};

use crate::vm::Vm;

/// Whether a handler swallowed the event or passed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Consumed,
    Ignored,
}

/// A key-down edge with the shift state sampled at poll time.
#[derive(Debug, Clone, Copy)]
pub struct KeyEvent {
    pub key: Key,
    pub shift: bool,
}

type Handler = Box<dyn FnMut(&KeyEvent, &mut Vm) -> Handled>;

pub struct InputQueue {
    events: VecDeque<KeyEvent>,
    handlers: Vec<Handler>,
}

impl InputQueue {
    pub fn new() -> Self {
        InputQueue {
            events: VecDeque::new(),
            handlers: Vec::new(),
        }
    }

    /// Append a handler; handlers run in registration order.
    pub fn add_handler(&mut self, handler: impl FnMut(&KeyEvent, &mut Vm) -> Handled + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Collect key-down edges from the window into the queue.
    pub fn poll(&mut self, window: &Window) {
        let shift =
            window.is_key_down(Key::LeftShift) || window.is_key_down(Key::RightShift);
        for key in window.get_keys_pressed(KeyRepeat::Yes) {
            self.events.push_back(KeyEvent { key, shift });
        }
    }

    /// Drain the queue through the handler chain.
    pub fn dispatch(&mut self, vm: &mut Vm) {
        while let Some(event) = self.events.pop_front() {
            for handler in &mut self.handlers {
                if handler(&event, vm) == Handled::Consumed {
                    break;
                }
            }
        }
    }

    #[cfg(test)]
    fn push(&mut self, event: KeyEvent) {
        self.events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::cpu::cpu::Mos6502;

    fn key(k: Key) -> KeyEvent {
        KeyEvent {
            key: k,
            shift: false,
        }
    }

    #[test]
    fn first_consuming_handler_stops_the_chain() {
        let mut vm = Vm::new(Box::new(Mos6502::new()));
        let mut input = InputQueue::new();
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));

        let f = first.clone();
        input.add_handler(move |_, _| {
            f.set(f.get() + 1);
            Handled::Consumed
        });
        let s = second.clone();
        input.add_handler(move |_, _| {
            s.set(s.get() + 1);
            Handled::Ignored
        });

        input.push(key(Key::A));
        input.dispatch(&mut vm);

        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 0);
    }

    #[test]
    fn ignored_events_fall_through_in_order() {
        let mut vm = Vm::new(Box::new(Mos6502::new()));
        let mut input = InputQueue::new();
        let seen = Rc::new(Cell::new(0));

        input.add_handler(|_, _| Handled::Ignored);
        let s = seen.clone();
        input.add_handler(move |_, _| {
            s.set(s.get() + 1);
            Handled::Consumed
        });

        input.push(key(Key::A));
        input.push(key(Key::B));
        input.dispatch(&mut vm);

        assert_eq!(seen.get(), 2);
    }
}
