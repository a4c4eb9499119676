use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use bevy::prelude::*;
use constants::triggers::DEFAULT_LAYER;

use crate::xr::error::XrError;

/// Trigger identity: the entity carrying the volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(pub Entity);

/// Render layer index.
pub type LayerId = usize;

/// One object a trigger claims, with the layer it asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerTarget {
    pub object: Entity,
    pub layer: LayerId,
}

/// An active layer claim on an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerRequest {
    pub trigger: TriggerId,
    pub object: Entity,
    pub layer: LayerId,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerOp {
    Enter(TriggerRequest),
    Leave { trigger: TriggerId, object: Entity },
}

/// Layer operations accumulated during a frame, drained by one flush.
#[derive(Debug, Default)]
pub struct LayerOpLog {
    ops: Vec<LayerOp>,
}

impl LayerOpLog {
    pub fn push(&mut self, op: LayerOp) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn drain(&mut self) -> Vec<LayerOp> {
        std::mem::take(&mut self.ops)
    }
}

#[derive(Debug)]
struct PendingFlip {
    entering: bool,
    timer: Timer,
}

#[derive(Debug)]
struct TriggerState {
    label: String,
    targets: Vec<TriggerTarget>,
    debounce: Duration,
    inside: bool,
    pending: Option<PendingFlip>,
}

/// Who owns which room object, and on which layer.
///
/// Inserted with the room scene and removed on teardown, so counts,
/// requests and pending timers never outlive the scene that made them.
#[derive(Resource, Debug)]
pub struct TriggerOwnership {
    layers: HashSet<LayerId>,
    triggers: HashMap<TriggerId, TriggerState>,
    counts: HashMap<Entity, u32>,
    requests: HashMap<Entity, HashMap<TriggerId, TriggerRequest>>,
    applied: HashMap<Entity, LayerId>,
    log: LayerOpLog,
    visibility: Vec<(Entity, bool)>,
    next_seq: u64,
}

impl TriggerOwnership {
    pub fn new(layers: impl IntoIterator<Item = LayerId>) -> Self {
        Self {
            layers: layers.into_iter().collect(),
            triggers: HashMap::new(),
            counts: HashMap::new(),
            requests: HashMap::new(),
            applied: HashMap::new(),
            log: LayerOpLog::default(),
            visibility: Vec::new(),
            next_seq: 1,
        }
    }

    pub fn register(
        &mut self,
        id: TriggerId,
        label: impl Into<String>,
        targets: Vec<TriggerTarget>,
        debounce: Duration,
    ) {
        self.triggers.entry(id).or_insert_with(|| TriggerState {
            label: label.into(),
            targets,
            debounce,
            inside: false,
            pending: None,
        });
    }

    pub fn is_registered(&self, id: TriggerId) -> bool {
        self.triggers.contains_key(&id)
    }

    /// Forget a trigger. Its pending timer dies with it; if it was inside,
    /// its claims are retracted as if it had been left.
    pub fn unregister(&mut self, id: TriggerId) {
        let Some(mut state) = self.triggers.remove(&id) else {
            return;
        };
        state.pending = None;
        if state.inside {
            self.apply_flip(id, &state.label, &state.targets, false);
        }
    }

    /// Raw enter from the volume. Cancels a pending leave.
    pub fn on_enter(&mut self, id: TriggerId) {
        self.schedule(id, true);
    }

    /// Raw leave from the volume. Cancels a pending enter.
    pub fn on_leave(&mut self, id: TriggerId) {
        self.schedule(id, false);
    }

    fn schedule(&mut self, id: TriggerId, entering: bool) {
        let Some(state) = self.triggers.get_mut(&id) else {
            return;
        };
        if state
            .pending
            .as_ref()
            .is_some_and(|pending| pending.entering != entering)
        {
            state.pending = None;
        }
        if state.inside == entering || state.pending.is_some() {
            return;
        }
        state.pending = Some(PendingFlip {
            entering,
            timer: Timer::new(state.debounce, TimerMode::Once),
        });
    }

    /// Advance debounce timers; fired timers flip their trigger.
    pub fn tick(&mut self, delta: Duration) {
        let mut fired = Vec::new();
        for (id, state) in self.triggers.iter_mut() {
            let Some(pending) = state.pending.as_mut() else {
                continue;
            };
            if pending.timer.tick(delta).finished() {
                fired.push((*id, pending.entering));
                state.pending = None;
            }
        }
        fired.sort();

        for (id, entering) in fired {
            let Some(state) = self.triggers.get_mut(&id) else {
                continue;
            };
            if state.inside == entering {
                continue;
            }
            state.inside = entering;
            let label = state.label.clone();
            let targets = state.targets.clone();
            self.apply_flip(id, &label, &targets, entering);
        }
    }

    fn apply_flip(&mut self, id: TriggerId, label: &str, targets: &[TriggerTarget], entering: bool) {
        for target in targets {
            let count = self.counts.entry(target.object).or_insert(0);
            let was_visible = *count > 0;
            *count = if entering {
                count.saturating_add(1)
            } else {
                count.saturating_sub(1)
            };
            let visible = *count > 0;
            if visible != was_visible {
                self.visibility.push((target.object, visible));
            }

            if !self.layers.contains(&target.layer) {
                let err = XrError::MissingLayer {
                    trigger: label.to_string(),
                    layer: target.layer,
                };
                warn!("{err}; layer assignment skipped for {:?}", target.object);
                continue;
            }

            if entering {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.log.push(LayerOp::Enter(TriggerRequest {
                    trigger: id,
                    object: target.object,
                    layer: target.layer,
                    seq,
                }));
            } else {
                self.log.push(LayerOp::Leave {
                    trigger: id,
                    object: target.object,
                });
            }
        }
    }

    /// Visibility flips since the last call, in the order they happened.
    pub fn take_visibility_changes(&mut self) -> Vec<(Entity, bool)> {
        std::mem::take(&mut self.visibility)
    }

    /// Drain the frame's log and resolve every touched object to the layer
    /// of its highest-sequence request. Returns only objects whose layer
    /// actually changes.
    pub fn flush(&mut self) -> Vec<(Entity, LayerId)> {
        if self.log.is_empty() {
            return Vec::new();
        }
        let ops = self.log.drain();
        let mut touched = BTreeSet::new();

        for op in &ops {
            if let LayerOp::Enter(request) = op {
                self.requests
                    .entry(request.object)
                    .or_default()
                    .insert(request.trigger, *request);
                touched.insert(request.object);
            }
        }
        for op in &ops {
            if let LayerOp::Leave { trigger, object } = op {
                if let Some(claims) = self.requests.get_mut(object) {
                    claims.remove(trigger);
                    if claims.is_empty() {
                        self.requests.remove(object);
                    }
                }
                touched.insert(*object);
            }
        }

        let mut changes = Vec::new();
        for object in touched {
            let layer = self.active_layer(object);
            let current = self.applied.get(&object).copied().unwrap_or(DEFAULT_LAYER);
            if current != layer {
                self.applied.insert(object, layer);
                changes.push((object, layer));
            }
        }
        changes
    }

    /// Layer the object should be on given its current requests.
    pub fn active_layer(&self, object: Entity) -> LayerId {
        self.requests
            .get(&object)
            .and_then(|claims| claims.values().max_by_key(|request| request.seq))
            .map_or(DEFAULT_LAYER, |request| request.layer)
    }

    pub fn count(&self, object: Entity) -> u32 {
        self.counts.get(&object).copied().unwrap_or(0)
    }

    pub fn is_inside(&self, id: TriggerId) -> bool {
        self.triggers.get(&id).is_some_and(|state| state.inside)
    }

    pub fn has_pending(&self, id: TriggerId) -> bool {
        self.triggers
            .get(&id)
            .is_some_and(|state| state.pending.is_some())
    }

    pub fn pending_ops(&self) -> usize {
        self.log.len()
    }

    pub fn request_count(&self, object: Entity) -> usize {
        self.requests.get(&object).map_or(0, HashMap::len)
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }
}
