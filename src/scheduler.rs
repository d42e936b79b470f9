//! The central event scheduler: a single monotonic T-cycle counter plus an
//! insert-sorted queue of future events, each keyed by an absolute cycle
//! stamp. Every time-sensitive subsystem schedules its own future work here
//! instead of owning a clock of its own.
use binary_heap_plus::{BinaryHeap, MinComparator};
use bitflags::_core::cmp::Ordering;

/// The finite set of event kinds the scheduler can hold. At most one event
/// of a given kind is ever pending; scheduling a kind that is already
/// present replaces the existing one.
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    NONE = 255,
    VBLANK = 0,
    OamSearch = 1,
    LcdTransfer = 2,
    HBLANK = 3,
    VblankWait = 4,
    APUFrameSequencer = 5,
    APUSample = 6,
    TimerOverflow = 7,
    TimerPostOverflow = 8,
    DMATransferComplete = 9,
    DMARequested = 10,
    GDMARequested = 11,
    GDMATransferComplete = 12,
    SerialBitTransfer = 13,
    EIPending = 14,
    CameraShoot = 15,
}

impl EventType {
    /// Per §4.A: events whose remaining delay must be rescaled when the CPU
    /// toggles CGB double speed. PPU and APU events are explicitly exempt.
    pub fn is_speed_sensitive(self) -> bool {
        matches!(
            self,
            EventType::TimerOverflow
                | EventType::TimerPostOverflow
                | EventType::DMARequested
                | EventType::DMATransferComplete
                | EventType::SerialBitTransfer
                | EventType::EIPending
        )
    }
}

#[derive(Debug, Copy, Clone, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub event_type: EventType,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.timestamp.partial_cmp(&other.timestamp)
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp.cmp(&other.timestamp)
    }
}

impl Event {
    /// Update the current event with new data.
    ///
    /// `delta_timestamp` will add the given time to the current `Event`'s `timestamp`.
    pub fn update_self(mut self, new_event_type: EventType, delta_timestamp: u64) -> Self {
        self.timestamp += delta_timestamp;
        self.event_type = new_event_type;
        self
    }
}

#[derive(Debug)]
pub struct Scheduler {
    // Want the smallest timestamp first, so MinComparator
    event_queue: BinaryHeap<Event, MinComparator>,
    pub current_time: u64,
    /// The cycle at which the internal DIV clock was last reset; `sys_clock()`
    /// is defined relative to this.
    div_reset_cycle: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        let mut result = Self {
            event_queue: BinaryHeap::with_capacity_min(64),
            current_time: 0,
            div_reset_cycle: 0,
        };
        result.event_queue.push(Event {
            timestamp: 0,
            event_type: EventType::NONE,
        });
        result
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.current_time
    }

    /// Returns a `Some(&Event)` if there is an event available which has a timestamp
    /// which is at or below the `current_time` for the `Scheduler`
    pub fn pop_closest(&mut self) -> Option<Event> {
        if let Some(event) = self.event_queue.peek() {
            if event.timestamp <= self.current_time {
                return self.event_queue.pop();
            }
        }
        None
    }

    /// Add a new event to the `Scheduler`.
    pub fn push_event(&mut self, event_type: EventType, timestamp: u64) {
        self.event_queue.push(Event { timestamp, event_type });
    }

    pub fn push_relative(&mut self, event_type: EventType, relative_timestamp: u64) {
        self.event_queue.push(Event {
            timestamp: self.current_time + relative_timestamp,
            event_type,
        });
    }

    /// Add an event to the `Scheduler`.
    /// This function is best used when we want to avoid an allocation for a new event,
    /// say in the `pop_closest()` loop for the scheduler. Instead we can then reuse that event
    /// and push it back in here.
    pub fn push_full_event(&mut self, event: Event) {
        self.event_queue.push(event);
    }

    /// Removes every pending event of `event_type`. Returns whether any were present.
    pub fn remove_event_type(&mut self, event_type: EventType) -> bool {
        // Very inefficient way of doing this, but until we start needing to do more dynamic
        // removal of events it doesn't really matter.
        let before = self.event_queue.len();
        self.event_queue = BinaryHeap::from_vec(
            self.event_queue
                .clone()
                .into_iter()
                .filter(|e| e.event_type != event_type)
                .collect(),
        );
        self.event_queue.len() != before
    }

    #[inline]
    pub fn add_cycles(&mut self, delta_cycles: u64) {
        self.current_time += delta_cycles;
    }

    /// Insert an event of `kind` at `now + delta`, replacing any event of the
    /// same kind already present.
    pub fn schedule(&mut self, kind: EventType, delta_from_now: u64) {
        self.deschedule(kind);
        self.push_relative(kind, delta_from_now);
    }

    /// Remove the pending event of `kind`, if any. Returns whether one was present.
    pub fn deschedule(&mut self, kind: EventType) -> bool {
        self.remove_event_type(kind)
    }

    /// Time from now until the next pending event of `kind`, if one exists.
    pub fn until(&self, kind: EventType) -> Option<u64> {
        self.event_queue
            .clone()
            .into_iter()
            .filter(|e| e.event_type == kind)
            .map(|e| e.timestamp.saturating_sub(self.current_time))
            .min()
    }

    /// Fire every event due at or before `now + delta`, in cycle order, then
    /// set `now = now + delta`. Handlers may themselves schedule new events at
    /// or before the new `now`; `drain_due` below is invoked again by the
    /// caller in that case (reentrant firing).
    pub fn advance<F: FnMut(EventType)>(&mut self, delta: u64, mut handler: F) {
        assert!(delta < (1u64 << 63), "scheduler advance with an effectively negative delta");
        let target = self.current_time + delta;

        loop {
            match self.event_queue.peek() {
                Some(event) if event.timestamp <= target => {
                    let event = self.event_queue.pop().expect("peeked event vanished");
                    self.current_time = event.timestamp;
                    handler(event.event_type);
                }
                _ => break,
            }
        }

        self.current_time = target;
    }

    /// Low 16 bits of `now - div_reset_cycle`; backs the DIV register.
    #[inline]
    pub fn sys_clock(&self) -> u16 {
        self.current_time.wrapping_sub(self.div_reset_cycle) as u16
    }

    /// Reset the DIV-derivation base to the current cycle (DIV register write).
    #[inline]
    pub fn reset_sys_clock(&mut self) {
        self.div_reset_cycle = self.current_time;
    }

    /// Rescale every speed-sensitive pending event's remaining delay when CGB
    /// double speed is toggled. PPU and APU events are left untouched.
    pub fn change_speed(&mut self, double: bool) {
        let now = self.current_time;
        let rescaled: Vec<Event> = self
            .event_queue
            .clone()
            .into_iter()
            .map(|mut event| {
                if event.event_type.is_speed_sensitive() {
                    let remaining = event.timestamp.saturating_sub(now);
                    let rescaled_remaining = if double { remaining / 2 } else { remaining * 2 };
                    event.timestamp = now + rescaled_remaining;
                }
                event
            })
            .collect();
        self.event_queue = BinaryHeap::from_vec(rescaled);
    }
}
