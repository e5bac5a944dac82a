//! Multi-contact gesture recognizer.
//!
//! Each sticker runs its own small state machine:
//!
//! ```text
//!   Idle --1st contact--> Dragging --2nd contact--> Pinching
//!    ^                       |  ^                      |
//!    +----last contact up----+  +--one contact left----+
//! ```
//!
//! [`GestureState::step`] is the pure transition function. [`GestureRecognizer`] routes
//! contacts to the sticker that owns them and commits the resulting transforms to the
//! [`StickerBoard`].

use std::collections::HashMap;

use log::{debug, trace};

use crate::transform::{StickerBoard, StickerId, Transform, clamp_scale};
use crate::types::{ContactId, Point, StageSize};

/// Below this finger distance (stage px) a pinch has no usable scale/angle baseline.
pub const PINCH_EPSILON: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureEvent {
    Down(ContactId, Point),
    Move(ContactId, Point),
    Up(ContactId),
}

/// Distance/angle snapshot a pinch scales and rotates against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinchBasis {
    pub distance: f32,
    /// Radians.
    pub angle: f32,
    pub scale: f32,
    pub rotation: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinchBaseline {
    pub pair: (ContactId, ContactId),
    /// `None` while the two contacts are (numerically) on top of each other.
    pub basis: Option<PinchBasis>,
    /// Advanced on every move; midpoint drift is integrated step by step.
    pub last_mid: Point,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Phase {
    #[default]
    Idle,
    /// Offset from the sticker anchor to the contact, captured when the drag (re)started.
    Dragging { offset: Point },
    Pinching(PinchBaseline),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Dragging { .. } => "dragging",
            Phase::Pinching(_) => "pinching",
        }
    }
}

/// Live contacts of one sticker plus the current phase.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GestureState {
    contacts: Vec<(ContactId, Point)>,
    phase: Phase,
}

impl GestureState {
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn contacts(&self) -> impl Iterator<Item = (ContactId, Point)> + '_ {
        self.contacts.iter().copied()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_idle(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Record a contact's new point without stepping the machine.
    fn set_point(&mut self, id: ContactId, point: Point) {
        if let Some(slot) = self.contacts.iter_mut().find(|(c, _)| *c == id) {
            slot.1 = point;
        }
    }

    fn point_of(&self, id: ContactId) -> Option<Point> {
        self.contacts.iter().find(|(c, _)| *c == id).map(|(_, p)| *p)
    }

    /// Apply one event. Returns the next state and, when the sticker moved, its new
    /// transform (position, scale and rotation together).
    pub fn step(
        mut self,
        event: GestureEvent,
        current: Transform,
        stage: StageSize,
    ) -> (GestureState, Option<Transform>) {
        match event {
            GestureEvent::Down(id, point) => {
                if self.point_of(id).is_some() {
                    return (self, None);
                }
                self.contacts.push((id, point));
                self.phase = self.rebaseline(current, stage);
                (self, None)
            }
            GestureEvent::Up(id) => {
                if self.point_of(id).is_none() {
                    return (self, None);
                }
                self.contacts.retain(|(c, _)| *c != id);
                self.phase = self.rebaseline(current, stage);
                (self, None)
            }
            GestureEvent::Move(id, point) => {
                let Some(slot) = self.contacts.iter_mut().find(|(c, _)| *c == id) else {
                    return (self, None);
                };
                slot.1 = point;

                let phase = self.phase;
                match phase {
                    Phase::Idle => (self, None),
                    Phase::Dragging { offset } => {
                        let next = current.with_anchor(point - offset, stage);
                        (self, Some(next))
                    }
                    Phase::Pinching(baseline) => {
                        if id != baseline.pair.0 && id != baseline.pair.1 {
                            return (self, None);
                        }
                        let (Some(a), Some(b)) =
                            (self.point_of(baseline.pair.0), self.point_of(baseline.pair.1))
                        else {
                            return (self, None);
                        };
                        let (baseline, next) = pinch_step(baseline, a, b, current, stage);
                        self.phase = Phase::Pinching(baseline);
                        (self, Some(next))
                    }
                }
            }
        }
    }

    /// Fresh baseline for the current contact set. A pinch baseline survives only while
    /// the same two contacts lead the set.
    fn rebaseline(&self, current: Transform, stage: StageSize) -> Phase {
        match self.contacts.as_slice() {
            [] => Phase::Idle,
            [(_, point)] => Phase::Dragging {
                offset: *point - current.anchor(stage),
            },
            [(id_a, a), (id_b, b), ..] => {
                if let Phase::Pinching(baseline) = self.phase
                    && baseline.pair == (*id_a, *id_b)
                {
                    return Phase::Pinching(baseline);
                }
                Phase::Pinching(PinchBaseline {
                    pair: (*id_a, *id_b),
                    basis: pinch_basis(*a, *b, current),
                    last_mid: a.midpoint(*b),
                })
            }
        }
    }
}

fn pinch_basis(a: Point, b: Point, current: Transform) -> Option<PinchBasis> {
    let distance = a.distance(b);
    (distance > PINCH_EPSILON).then(|| PinchBasis {
        distance,
        angle: a.angle_to(b),
        scale: current.scale,
        rotation: current.rotation,
    })
}

/// Signed turn from `from` to `to`, in [-π, π).
fn angle_delta(from: f32, to: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    (to - from + PI).rem_euclid(TAU) - PI
}

fn pinch_step(
    mut baseline: PinchBaseline,
    a: Point,
    b: Point,
    current: Transform,
    stage: StageSize,
) -> (PinchBaseline, Transform) {
    let mid = a.midpoint(b);

    let (scale, rotation) = match baseline.basis {
        Some(basis) => {
            let scale = clamp_scale(basis.scale * (a.distance(b) / basis.distance));
            let rotation = basis.rotation + angle_delta(basis.angle, a.angle_to(b)).to_degrees();
            (scale, rotation)
        }
        None => {
            // Degenerate start: wait until the contacts separate, then baseline from here.
            baseline.basis = pinch_basis(a, b, current);
            if baseline.basis.is_some() {
                trace!("pinch separated, scale/rotation baseline captured");
            }
            (current.scale, current.rotation)
        }
    };

    let anchor = current.anchor(stage) + (mid - baseline.last_mid);
    baseline.last_mid = mid;

    let next = Transform {
        scale,
        rotation,
        ..current
    }
    .with_anchor(anchor, stage);
    (baseline, next)
}

/// Routes contacts to per-sticker gesture state. A contact drives exactly one sticker
/// from its start until it ends.
#[derive(Debug, Default)]
pub struct GestureRecognizer {
    sessions: HashMap<StickerId, GestureState>,
    owners: HashMap<ContactId, StickerId>,
}

impl GestureRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new contact to `sticker`. Returns false when the contact is already
    /// driving a sticker or the sticker does not exist.
    pub fn on_contact_start(
        &mut self,
        board: &StickerBoard,
        stage: StageSize,
        sticker: StickerId,
        contact: ContactId,
        point: Point,
    ) -> bool {
        if self.owners.contains_key(&contact) {
            trace!("contact {contact:?} already captured; ignoring start");
            return false;
        }
        let Some(current) = board.transform(sticker) else {
            return false;
        };
        self.owners.insert(contact, sticker);
        self.apply(sticker, GestureEvent::Down(contact, point), current, stage);
        true
    }

    /// Returns the sticker whose transform changed, if any.
    pub fn on_contact_move(
        &mut self,
        board: &mut StickerBoard,
        stage: StageSize,
        contact: ContactId,
        point: Point,
    ) -> Option<StickerId> {
        let sticker = *self.owners.get(&contact)?;
        let Some(current) = board.transform(sticker) else {
            self.forget(sticker);
            return None;
        };
        let next = self.apply(sticker, GestureEvent::Move(contact, point), current, stage)?;
        board.set_transform(sticker, next);
        Some(sticker)
    }

    /// Move several contacts of one sticker as a single step: every point but the last
    /// is recorded first, then the last one's move computes the new transform.
    pub fn on_contacts_move(
        &mut self,
        board: &mut StickerBoard,
        stage: StageSize,
        moves: &[(ContactId, Point)],
    ) -> Option<StickerId> {
        let ((last, last_point), rest) = moves.split_last()?;
        let sticker = self.owner(*last)?;
        if let Some(state) = self.sessions.get_mut(&sticker) {
            for (contact, point) in rest {
                if self.owners.get(contact) == Some(&sticker) {
                    state.set_point(*contact, *point);
                }
            }
        }
        self.on_contact_move(board, stage, *last, *last_point)
    }

    /// Ends a contact. Unknown contacts are ignored. Returns the sticker it belonged to.
    pub fn on_contact_end(
        &mut self,
        board: &StickerBoard,
        stage: StageSize,
        contact: ContactId,
    ) -> Option<StickerId> {
        let Some(sticker) = self.owners.remove(&contact) else {
            trace!("end for unknown contact {contact:?}");
            return None;
        };
        let current = board.transform(sticker).unwrap_or_default();
        self.apply(sticker, GestureEvent::Up(contact), current, stage);
        Some(sticker)
    }

    fn apply(
        &mut self,
        sticker: StickerId,
        event: GestureEvent,
        current: Transform,
        stage: StageSize,
    ) -> Option<Transform> {
        let state = self.sessions.remove(&sticker).unwrap_or_default();
        let before = state.phase.name();
        let (state, next) = state.step(event, current, stage);
        let after = state.phase.name();
        if before != after {
            debug!("sticker {sticker:?}: {before} -> {after}");
        }
        if !state.is_idle() {
            self.sessions.insert(sticker, state);
        }
        next
    }

    pub fn state(&self, sticker: StickerId) -> Option<&GestureState> {
        self.sessions.get(&sticker)
    }

    pub fn phase(&self, sticker: StickerId) -> Phase {
        self.sessions
            .get(&sticker)
            .map(|s| s.phase)
            .unwrap_or_default()
    }

    /// The sticker currently held by exactly one contact, if there is exactly one such
    /// sticker. A stray contact may join it to start a pinch.
    pub fn sole_dragging_sticker(&self) -> Option<StickerId> {
        let mut dragging = self
            .sessions
            .iter()
            .filter(|(_, s)| s.contact_count() == 1)
            .map(|(id, _)| *id);
        let first = dragging.next()?;
        dragging.next().is_none().then_some(first)
    }

    pub fn owner(&self, contact: ContactId) -> Option<StickerId> {
        self.owners.get(&contact).copied()
    }

    /// Last known point of a captured contact.
    pub fn contact_point(&self, contact: ContactId) -> Option<Point> {
        let sticker = self.owner(contact)?;
        self.sessions.get(&sticker)?.point_of(contact)
    }

    /// Every captured contact with its last point.
    pub fn live_contacts(&self) -> impl Iterator<Item = (ContactId, Point)> + '_ {
        self.sessions.values().flat_map(GestureState::contacts)
    }

    /// Drop all gesture state for a sticker that went away.
    pub fn forget(&mut self, sticker: StickerId) {
        self.sessions.remove(&sticker);
        self.owners.retain(|_, owner| *owner != sticker);
    }

    pub fn reset(&mut self) {
        self.sessions.clear();
        self.owners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE: StageSize = StageSize::new(1080.0, 1920.0);

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    fn c(n: u64) -> ContactId {
        ContactId(n)
    }

    /// Drive a single state with a sequence of events, committing transforms like the
    /// recognizer does.
    fn run(events: &[GestureEvent]) -> (GestureState, Transform) {
        let mut state = GestureState::default();
        let mut t = Transform::default();
        for ev in events {
            let (next, out) = state.step(*ev, t, STAGE);
            state = next;
            if let Some(out) = out {
                t = out.clamped();
            }
        }
        (state, t)
    }

    #[test]
    fn first_contact_starts_drag_without_moving() {
        let (state, t) = run(&[GestureEvent::Down(c(1), p(600.0, 1000.0))]);
        assert_eq!(
            *state.phase(),
            Phase::Dragging {
                offset: p(60.0, 40.0)
            }
        );
        assert_eq!(t, Transform::default());
    }

    #[test]
    fn drag_moves_by_contact_delta() {
        let (_, t) = run(&[
            GestureEvent::Down(c(1), p(540.0, 960.0)),
            GestureEvent::Move(c(1), p(600.0, 960.0)),
        ]);
        assert!((t.x - (50.0 + 60.0 / 1080.0 * 100.0)).abs() < 1e-4);
        assert_eq!(t.y, 50.0);
    }

    #[test]
    fn drag_clamps_to_stage_band() {
        let (_, t) = run(&[
            GestureEvent::Down(c(1), p(540.0, 960.0)),
            GestureEvent::Move(c(1), p(-4000.0, 9000.0)),
        ]);
        assert_eq!((t.x, t.y), (2.0, 98.0));
    }

    #[test]
    fn pinch_scales_by_distance_ratio() {
        let (state, t) = run(&[
            GestureEvent::Down(c(1), p(500.0, 960.0)),
            GestureEvent::Down(c(2), p(580.0, 960.0)),
            GestureEvent::Move(c(1), p(450.0, 960.0)),
            GestureEvent::Move(c(2), p(630.0, 960.0)),
        ]);
        assert!(matches!(state.phase(), Phase::Pinching(_)));
        assert!((t.scale - 2.25).abs() < 1e-5, "scale {}", t.scale);
        // Symmetric spread: the midpoint never moved.
        assert!((t.x - 50.0).abs() < 1e-4);
        assert_eq!(t.rotation, 0.0);
    }

    #[test]
    fn pinch_scale_saturates_at_max() {
        let (_, t) = run(&[
            GestureEvent::Down(c(1), p(539.0, 960.0)),
            GestureEvent::Down(c(2), p(541.0, 960.0)),
            GestureEvent::Move(c(2), p(2541.0, 960.0)),
        ]);
        assert_eq!(t.scale, 3.0);
    }

    #[test]
    fn pinch_rotation_follows_contact_angle() {
        let (_, t) = run(&[
            GestureEvent::Down(c(1), p(540.0, 960.0)),
            GestureEvent::Down(c(2), p(640.0, 960.0)),
            GestureEvent::Move(c(2), p(540.0, 1060.0)),
        ]);
        assert!((t.rotation - 90.0).abs() < 1e-3, "rotation {}", t.rotation);
    }

    #[test]
    fn rotation_does_not_jump_across_half_turn() {
        // Contact angle goes from +π to just above -π: a small turn, not a full one.
        let (_, t) = run(&[
            GestureEvent::Down(c(1), p(540.0, 960.0)),
            GestureEvent::Down(c(2), p(440.0, 960.0)),
            GestureEvent::Move(c(2), p(440.0, 950.0)),
        ]);
        assert!(t.rotation.abs() < 10.0, "rotation {}", t.rotation);
        assert!(t.rotation > 0.0);
    }

    #[test]
    fn second_pinch_rebaselines_rotation() {
        let (state, t) = run(&[
            GestureEvent::Down(c(1), p(540.0, 960.0)),
            GestureEvent::Down(c(2), p(640.0, 960.0)),
            GestureEvent::Move(c(2), p(540.0, 1060.0)),
            GestureEvent::Up(c(2)),
            GestureEvent::Up(c(1)),
            // New gesture starts from the new contact angle, not from the old baseline.
            GestureEvent::Down(c(3), p(540.0, 960.0)),
            GestureEvent::Down(c(4), p(540.0, 1060.0)),
            GestureEvent::Move(c(4), p(540.0, 1061.0)),
        ]);
        assert!((t.rotation - 90.0).abs() < 1e-3, "rotation {}", t.rotation);
        assert_eq!(state.contact_count(), 2);
    }

    #[test]
    fn midpoint_drift_is_incremental() {
        let (_, t) = run(&[
            GestureEvent::Down(c(1), p(500.0, 960.0)),
            GestureEvent::Down(c(2), p(580.0, 960.0)),
            GestureEvent::Move(c(1), p(510.0, 960.0)),
            GestureEvent::Move(c(2), p(590.0, 960.0)),
        ]);
        // Both contacts moved 10px right: anchor moved 10px, not 15px (5 + 10).
        let expected = (540.0 + 10.0) / 1080.0 * 100.0;
        assert!((t.x - expected).abs() < 1e-4, "x {} vs {}", t.x, expected);
    }

    #[test]
    fn release_to_one_contact_uses_fresh_drag_offset() {
        let (state, t) = run(&[
            GestureEvent::Down(c(1), p(500.0, 960.0)),
            GestureEvent::Down(c(2), p(580.0, 960.0)),
            GestureEvent::Move(c(2), p(680.0, 960.0)),
            GestureEvent::Up(c(1)),
        ]);
        let anchor = t.anchor(STAGE);
        assert_eq!(
            *state.phase(),
            Phase::Dragging {
                offset: p(680.0, 960.0) - anchor
            }
        );

        let mut state = state;
        let (next, out) = state
            .clone()
            .step(GestureEvent::Move(c(2), p(700.0, 980.0)), t, STAGE);
        state = next;
        let out = out.unwrap();
        let moved = out.anchor(STAGE);
        assert!((moved.x - (anchor.x + 20.0)).abs() < 1e-3);
        assert!((moved.y - (anchor.y + 20.0)).abs() < 1e-3);
        assert_eq!(out.scale, t.scale);
        assert!(matches!(state.phase(), Phase::Dragging { .. }));
    }

    #[test]
    fn coincident_pinch_start_suppresses_scale_until_separated() {
        let (state, t) = run(&[
            GestureEvent::Down(c(1), p(540.0, 960.0)),
            GestureEvent::Down(c(2), p(540.0, 960.0)),
            GestureEvent::Move(c(2), p(540.2, 960.0)),
        ]);
        assert_eq!(t.scale, 1.0);
        let Phase::Pinching(baseline) = state.phase() else {
            panic!("expected pinch");
        };
        assert!(baseline.basis.is_none());

        let (state, out) = state.step(GestureEvent::Move(c(2), p(560.0, 960.0)), t, STAGE);
        let t = out.unwrap();
        assert_eq!(t.scale, 1.0, "first separated move only captures the baseline");
        assert!(t.scale.is_finite() && t.rotation.is_finite());

        let (_, out) = state.step(GestureEvent::Move(c(2), p(580.0, 960.0)), t, STAGE);
        let t = out.unwrap();
        assert!((t.scale - 2.0).abs() < 1e-4, "scale {}", t.scale);
    }

    #[test]
    fn third_contact_keeps_pinch_pair() {
        let (state, _) = run(&[
            GestureEvent::Down(c(1), p(500.0, 960.0)),
            GestureEvent::Down(c(2), p(580.0, 960.0)),
            GestureEvent::Down(c(3), p(700.0, 700.0)),
        ]);
        let Phase::Pinching(baseline) = *state.phase() else {
            panic!("expected pinch");
        };
        assert_eq!(baseline.pair, (c(1), c(2)));

        let (state, out) = state.step(
            GestureEvent::Move(c(3), p(0.0, 0.0)),
            Transform::default(),
            STAGE,
        );
        assert!(out.is_none());

        let (state, _) = state.step(GestureEvent::Up(c(1)), Transform::default(), STAGE);
        let Phase::Pinching(baseline) = *state.phase() else {
            panic!("expected pinch");
        };
        assert_eq!(baseline.pair, (c(2), c(3)));
        assert_eq!(baseline.last_mid, p(580.0, 960.0).midpoint(p(0.0, 0.0)));
    }

    #[test]
    fn unknown_contacts_are_ignored() {
        let (state, t) = run(&[
            GestureEvent::Up(c(9)),
            GestureEvent::Move(c(9), p(0.0, 0.0)),
        ]);
        assert!(state.is_idle());
        assert_eq!(t, Transform::default());
    }

    #[test]
    fn recognizer_scopes_contacts_per_sticker() {
        let mut board = StickerBoard::new();
        let a = board.add("A");
        let b = board.add("B");
        let mut rec = GestureRecognizer::new();

        assert!(rec.on_contact_start(&board, STAGE, a, c(1), p(540.0, 960.0)));
        // Same contact cannot also drive B.
        assert!(!rec.on_contact_start(&board, STAGE, b, c(1), p(540.0, 960.0)));
        assert!(rec.on_contact_start(&board, STAGE, b, c(2), p(540.0, 960.0)));

        assert_eq!(rec.on_contact_move(&mut board, STAGE, c(1), p(640.0, 960.0)), Some(a));
        assert_ne!(board.transform(a), board.transform(b));
        assert_eq!(board.transform(b), Some(Transform::default()));
        assert!(matches!(rec.phase(a), Phase::Dragging { .. }));
        assert!(matches!(rec.phase(b), Phase::Dragging { .. }));
        assert_eq!(rec.sole_dragging_sticker(), None);

        assert_eq!(rec.on_contact_end(&board, STAGE, c(1)), Some(a));
        assert_eq!(rec.phase(a), Phase::Idle);
        assert_eq!(rec.sole_dragging_sticker(), Some(b));
        assert_eq!(rec.on_contact_end(&board, STAGE, c(1)), None);
    }

    #[test]
    fn recognizer_drops_gestures_of_removed_stickers() {
        let mut board = StickerBoard::new();
        let a = board.add("A");
        let mut rec = GestureRecognizer::new();
        assert!(rec.on_contact_start(&board, STAGE, a, c(1), p(540.0, 960.0)));
        board.remove(a);
        assert_eq!(rec.on_contact_move(&mut board, STAGE, c(1), p(600.0, 960.0)), None);
        assert_eq!(rec.owner(c(1)), None);
        assert!(!rec.on_contact_start(&board, STAGE, a, c(2), p(540.0, 960.0)));
    }

    #[test]
    fn joint_move_of_both_contacts_is_one_step() {
        let mut board = StickerBoard::new();
        let a = board.add("A");
        let mut rec = GestureRecognizer::new();
        rec.on_contact_start(&board, STAGE, a, c(1), p(500.0, 960.0));
        rec.on_contact_start(&board, STAGE, a, c(2), p(580.0, 960.0));

        // Both spread symmetrically: the midpoint never moves, so neither does the sticker.
        let moved = rec.on_contacts_move(
            &mut board,
            STAGE,
            &[(c(2), p(620.0, 960.0)), (c(1), p(460.0, 960.0))],
        );
        assert_eq!(moved, Some(a));
        let t = board.transform(a).unwrap();
        assert!((t.scale - 2.0).abs() < 1e-5, "scale {}", t.scale);
        assert_eq!((t.x, t.y), (50.0, 50.0));
        assert_eq!(rec.contact_point(c(2)), Some(p(620.0, 960.0)));

        assert_eq!(rec.on_contacts_move(&mut board, STAGE, &[]), None);
    }
}
