//! Rolling chart buffers, one per channel.

use std::collections::{BTreeMap, VecDeque};

use parking_lot::Mutex;
use sysgauge_types::{Channel, SeriesPoint};

/// Default number of points kept per channel.
pub const DEFAULT_CAPACITY: usize = 20;

/// Fixed-capacity FIFO of series points.
///
/// Pushing onto a full buffer evicts the oldest point, so the buffer always
/// holds the most recent `capacity` points in push order.
#[derive(Debug, Clone)]
pub struct SeriesBuffer {
    capacity: usize,
    points: VecDeque<SeriesPoint>,
}

impl SeriesBuffer {
    /// Create an empty buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: SeriesPoint) {
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<SeriesPoint> {
        self.points.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&SeriesPoint> {
        self.points.back()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// The set of rolling buffers backing the live charts.
///
/// Every [`Channel`] has its own buffer. All channels share the default
/// capacity unless overridden with [`SeriesSet::with_capacity_for`]. Each
/// operation takes the internal lock once, so a push is a single
/// append-and-evict even when the monitor task and a run touch the set at the
/// same time.
#[derive(Debug)]
pub struct SeriesSet {
    buffers: Mutex<BTreeMap<Channel, SeriesBuffer>>,
}

impl Default for SeriesSet {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SeriesSet {
    /// Create buffers for every channel with a shared capacity.
    pub fn new(capacity: usize) -> Self {
        let buffers = Channel::ALL
            .iter()
            .map(|&channel| (channel, SeriesBuffer::new(capacity)))
            .collect();
        Self {
            buffers: Mutex::new(buffers),
        }
    }

    /// Override the capacity of one channel. Existing points are discarded.
    pub fn with_capacity_for(self, channel: Channel, capacity: usize) -> Self {
        self.buffers.lock().insert(channel, SeriesBuffer::new(capacity));
        self
    }

    /// Append a point to a channel, evicting the oldest if the buffer is full.
    pub fn push(&self, channel: Channel, point: SeriesPoint) {
        self.buffers
            .lock()
            .entry(channel)
            .or_insert_with(|| SeriesBuffer::new(DEFAULT_CAPACITY))
            .push(point);
    }

    /// Current contents of a channel, oldest first.
    pub fn snapshot(&self, channel: Channel) -> Vec<SeriesPoint> {
        self.buffers
            .lock()
            .get(&channel)
            .map(SeriesBuffer::snapshot)
            .unwrap_or_default()
    }

    /// Most recent point of a channel, if any.
    pub fn latest(&self, channel: Channel) -> Option<SeriesPoint> {
        self.buffers.lock().get(&channel).and_then(|b| b.latest().cloned())
    }

    pub fn capacity(&self, channel: Channel) -> usize {
        self.buffers
            .lock()
            .get(&channel)
            .map_or(DEFAULT_CAPACITY, SeriesBuffer::capacity)
    }

    /// Empty one channel.
    pub fn clear(&self, channel: Channel) {
        if let Some(buffer) = self.buffers.lock().get_mut(&channel) {
            buffer.clear();
        }
    }

    /// Empty every channel.
    pub fn clear_all(&self) {
        for buffer in self.buffers.lock().values_mut() {
            buffer.clear();
        }
    }
}
