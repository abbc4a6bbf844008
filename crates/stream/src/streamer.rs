use std::collections::VecDeque;
use std::time::{Duration, Instant};

use glam::Vec3;
use wavegrid_common::{GridCoord, TileSet};
use wavegrid_kernel::{GridError, WorldGrid};

/// Streaming configuration: window geometry and eviction slack.
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// Edge length of one cell in world units.
    pub cell_size: f32,
    /// Chebyshev radius, in cells, of the window that must stay resident
    /// around the observer.
    pub window_radius: i32,
    /// Extra rings a cell may drift past the window before eviction. Slack
    /// here keeps a wandering observer from churning the window edge.
    pub eviction_hysteresis: i32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            cell_size: 9.0,
            window_radius: 8,
            eviction_hysteresis: 2,
        }
    }
}

/// Cells created and evicted by one tick, in the order they were applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDelta {
    pub created: Vec<GridCoord>,
    pub evicted: Vec<GridCoord>,
}

impl StreamDelta {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.evicted.is_empty()
    }
}

/// Per-tick streaming statistics for instrumentation.
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    pub created_this_tick: usize,
    pub evicted_this_tick: usize,
    pub resident_cells: usize,
    pub tick_time: Duration,
}

/// Keeps the resident window centered on the observer.
///
/// Each tick creates every missing window cell, undecided with the full
/// candidate alphabet, and evicts cells that have drifted more than
/// `window_radius + eviction_hysteresis` away. Evicted state is gone for
/// good: a coordinate the observer returns to regenerates from scratch.
pub struct Streamer {
    config: StreamConfig,
    alphabet: TileSet,
    stats: StreamStats,
}

impl Streamer {
    /// `alphabet` seeds every cell this streamer creates.
    pub fn new(config: StreamConfig, alphabet: TileSet) -> Self {
        assert!(config.cell_size > 0.0, "cell_size must be positive");
        assert!(
            config.eviction_hysteresis >= 0,
            "eviction_hysteresis must be non-negative"
        );
        Self {
            config,
            alphabet,
            stats: StreamStats::default(),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The cell the observer currently stands in.
    pub fn observer_cell(&self, observer: Vec3) -> GridCoord {
        GridCoord::from_world(observer, self.config.cell_size)
    }

    /// Re-center the window: create missing cells, evict cells beyond the
    /// hysteresis band. Returns what changed.
    ///
    /// A negative `window_radius` disables streaming outright; no cell is
    /// required, and none is evicted either.
    pub fn tick(&mut self, observer: Vec3, grid: &mut WorldGrid) -> Result<StreamDelta, GridError> {
        let _span = tracing::info_span!("stream_tick").entered();
        let tick_start = Instant::now();

        let mut delta = StreamDelta::default();
        if self.config.window_radius < 0 {
            self.stats = StreamStats {
                resident_cells: grid.len(),
                tick_time: tick_start.elapsed(),
                ..StreamStats::default()
            };
            return Ok(delta);
        }

        let center = self.observer_cell(observer);

        // Missing window cells come up undecided, in window walk order.
        for coord in window_coords(center, self.config.window_radius) {
            if !grid.contains(coord) {
                tracing::debug!(?coord, "creating cell");
                grid.insert_cell(coord, self.alphabet)?;
                delta.created.push(coord);
            }
        }

        // Map order is not reproducible; sort so the eviction sequence is.
        let keep = self.config.window_radius + self.config.eviction_hysteresis;
        let mut stale: Vec<GridCoord> = grid
            .coords()
            .filter(|coord| coord.chebyshev(center) > keep)
            .collect();
        stale.sort();
        for coord in stale {
            tracing::debug!(?coord, "evicting cell");
            grid.evict_cell(coord);
            delta.evicted.push(coord);
        }

        self.stats = StreamStats {
            created_this_tick: delta.created.len(),
            evicted_this_tick: delta.evicted.len(),
            resident_cells: grid.len(),
            tick_time: tick_start.elapsed(),
        };

        tracing::trace!(
            created = delta.created.len(),
            evicted = delta.evicted.len(),
            resident = grid.len(),
            "stream tick complete"
        );
        Ok(delta)
    }

    /// Statistics from the last tick.
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }
}

/// Coordinates of the square window around `center`, in the fixed walk order
/// the rest of generation relies on. A negative radius yields nothing.
fn window_coords(center: GridCoord, radius: i32) -> impl Iterator<Item = GridCoord> {
    (-radius..=radius).flat_map(move |dx| {
        (-radius..=radius).map(move |dz| GridCoord::new(center.x + dx, center.z + dz))
    })
}

/// Frame time tracker for instrumentation. Keeps the most recent `capacity`
/// samples.
#[derive(Debug)]
pub struct FrameTimer {
    history: VecDeque<Duration>,
    capacity: usize,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be positive");
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(dt);
    }

    pub fn average(&self) -> Duration {
        if self.history.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.history.iter().sum();
        total / self.history.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.history.iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.history.iter().copied().min().unwrap_or(Duration::ZERO)
    }

    pub fn count(&self) -> usize {
        self.history.len()
    }
}
