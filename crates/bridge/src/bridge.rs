use wavegrid_common::GridCoord;
use wavegrid_kernel::{CollapseEvent, WorldEvent};

/// Renderer-agnostic consumer of world events. All visual backends implement
/// this trait.
///
/// Bridges only observe; they never reach back into the world. A real
/// renderer would instantiate a tile visual on collapse, oriented by the
/// event's rotation, and release it on evict.
pub trait RenderBridge {
    /// A cell was decided. Never called twice for a coordinate while it
    /// stays resident.
    fn on_collapse(&mut self, event: &CollapseEvent);

    /// A cell left the window; release anything shown for it.
    fn on_evict(&mut self, coord: GridCoord);

    /// A candidate set emptied out and was force-collapsed; the paired
    /// `on_collapse` call follows. Telemetry only, ignored by default.
    fn on_contradiction(&mut self, _coord: GridCoord) {}
}

/// Route a drained event log through a bridge, preserving order.
pub fn dispatch(bridge: &mut impl RenderBridge, events: &[WorldEvent]) {
    for event in events {
        match *event {
            WorldEvent::Collapsed {
                coord,
                tile,
                rotation,
            } => bridge.on_collapse(&CollapseEvent {
                coord,
                tile,
                rotation,
            }),
            WorldEvent::Contradiction { coord } => bridge.on_contradiction(coord),
            WorldEvent::Evicted { coord } => bridge.on_evict(coord),
        }
    }
    tracing::trace!(count = events.len(), "dispatched events");
}

/// Text bridge: one human-readable line per event, plus running counts.
///
/// Stands in for a GPU backend in the CLI and in tests.
#[derive(Debug, Default)]
pub struct DebugTextBridge {
    lines: Vec<String>,
    collapses: usize,
    evictions: usize,
    contradictions: usize,
}

impl DebugTextBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line produced so far, in event order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn collapses(&self) -> usize {
        self.collapses
    }

    pub fn evictions(&self) -> usize {
        self.evictions
    }

    pub fn contradictions(&self) -> usize {
        self.contradictions
    }

    /// The accumulated log as one string, one event per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

impl RenderBridge for DebugTextBridge {
    fn on_collapse(&mut self, event: &CollapseEvent) {
        self.collapses += 1;
        self.lines.push(format!(
            "place {:?} at ({}, {}) facing {}",
            event.tile,
            event.coord.x,
            event.coord.z,
            event.rotation.degrees()
        ));
    }

    fn on_evict(&mut self, coord: GridCoord) {
        self.evictions += 1;
        self.lines.push(format!("release ({}, {})", coord.x, coord.z));
    }

    fn on_contradiction(&mut self, coord: GridCoord) {
        self.contradictions += 1;
        self.lines
            .push(format!("contradiction at ({}, {})", coord.x, coord.z));
    }
}
