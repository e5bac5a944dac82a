//! Native input → contacts.
//!
//! The gesture engine only knows contacts (stable id + stage point). Each native input
//! API gets a thin adapter that turns its own reporting style into [`ContactEvent`]s.

use crate::types::{ContactId, Point};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ContactEvent {
    Start { contact: ContactId, point: Point },
    Move { contact: ContactId, point: Point },
    End { contact: ContactId },
    /// Start `contact` on the same sticker as `of`, at `of`'s point reflected through
    /// that sticker's anchor. Lets a single pointer pinch and rotate.
    Mirror { contact: ContactId, of: ContactId },
}

/// Which contacts the stage swallows (the host should suppress its default handling,
/// e.g. scrolling or page zoom, for consumed events).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CaptureScope {
    /// Only contacts that land on a sticker are consumed.
    #[default]
    Sticker,
    /// Every stage contact is consumed, and a contact landing beside a sticker that is
    /// held by one finger joins that sticker's gesture.
    Stage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    Consumed,
    PassThrough,
}

/// Touch APIs report the full list of live touches with every event; diff successive
/// lists into start/move/end.
#[derive(Debug, Default)]
pub struct TouchListAdapter {
    live: Vec<(ContactId, Point)>,
}

impl TouchListAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, touches: &[(ContactId, Point)]) -> Vec<ContactEvent> {
        let mut events = Vec::new();

        for (id, _) in &self.live {
            if !touches.iter().any(|(t, _)| t == id) {
                events.push(ContactEvent::End { contact: *id });
            }
        }
        for (id, point) in touches {
            match self.live.iter().find(|(l, _)| l == id) {
                Some((_, last)) if last != point => events.push(ContactEvent::Move {
                    contact: *id,
                    point: *point,
                }),
                Some(_) => {}
                None => events.push(ContactEvent::Start {
                    contact: *id,
                    point: *point,
                }),
            }
        }

        self.live = touches.to_vec();
        events
    }

    /// Touch cancel: every live touch ends.
    pub fn cancel(&mut self) -> Vec<ContactEvent> {
        self.update(&[])
    }
}

/// Contact id of the mouse pointer itself.
pub const MOUSE_CONTACT: ContactId = ContactId(0);
/// Contact id of the virtual finger pinned opposite the mouse during a pinch.
pub const PINNED_CONTACT: ContactId = ContactId(1);

/// One frame's worth of mouse state as the window reports it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MouseState {
    pub pos: Option<Point>,
    pub left_down: bool,
    /// Held at press time to pinch instead of drag.
    pub pinch_modifier: bool,
}

/// Polled mouse → contacts. Left button is a contact; pressing with the pinch modifier
/// also pins a mirrored second contact that stays put until release.
#[derive(Debug, Default)]
pub struct MouseAdapter {
    down: bool,
    pinned: bool,
    last: Option<Point>,
}

impl MouseAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pinching(&self) -> bool {
        self.pinned
    }

    pub fn update(&mut self, state: MouseState) -> Vec<ContactEvent> {
        let mut events = Vec::new();

        match (self.down, state.left_down, state.pos) {
            // Press.
            (false, true, Some(point)) => {
                self.down = true;
                self.last = Some(point);
                events.push(ContactEvent::Start {
                    contact: MOUSE_CONTACT,
                    point,
                });
                if state.pinch_modifier {
                    self.pinned = true;
                    events.push(ContactEvent::Mirror {
                        contact: PINNED_CONTACT,
                        of: MOUSE_CONTACT,
                    });
                }
            }
            // Held.
            (true, true, Some(point)) => {
                if self.last != Some(point) {
                    self.last = Some(point);
                    events.push(ContactEvent::Move {
                        contact: MOUSE_CONTACT,
                        point,
                    });
                }
            }
            // Release (or the pointer left the window).
            (true, false, _) | (true, true, None) => {
                self.down = false;
                self.last = None;
                events.push(ContactEvent::End {
                    contact: MOUSE_CONTACT,
                });
                if self.pinned {
                    self.pinned = false;
                    events.push(ContactEvent::End {
                        contact: PINNED_CONTACT,
                    });
                }
            }
            _ => {}
        }
        events
    }
}
