//! Simulated rig: pins, a positional model of each axis, scripted switches
//! and an operator that taps switches on demand.
//!
//! All timing comes from a shared [`VirtualClock`]; the controller's own
//! sleeps move simulated time forward, so a run that takes minutes on the
//! real machine finishes instantly and deterministically.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use stainer_traits::{Clock, DigitalIo, PinId, StepCounter, VirtualClock};
use tracing::trace;

use crate::error::HwError;

/// One recorded output write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinWrite {
    pub at: Duration,
    pub pin: PinId,
    pub high: bool,
}

/// How a simulated axis is moved.
#[derive(Debug, Clone)]
pub enum SimDrive {
    /// Rising edge on `step` moves one unit; `dir == increasing_level` moves
    /// toward the max limit.
    Stepper {
        step: PinId,
        dir: PinId,
        increasing_level: bool,
    },
    /// Each controller read while exactly one relay is high moves one unit
    /// and feeds one pulse into `counter`.
    Relay {
        increase: PinId,
        decrease: PinId,
        counter: Option<StepCounter>,
    },
}

/// Linear axis with a limit switch at each end. Position 0 presses
/// `min_limit`, position `length` presses `max_limit`.
#[derive(Debug, Clone)]
pub struct SimAxis {
    pub drive: SimDrive,
    pub min_limit: PinId,
    pub max_limit: PinId,
    pub length: i64,
    pub position: i64,
}

impl SimAxis {
    fn nudge(&mut self, toward_max: bool) -> bool {
        let next = if toward_max {
            self.position + 1
        } else {
            self.position - 1
        };
        let next = next.clamp(0, self.length);
        let moved = next != self.position;
        self.position = next;
        moved
    }

    fn presses(&self, pin: PinId) -> bool {
        (pin == self.min_limit && self.position <= 0)
            || (pin == self.max_limit && self.position >= self.length)
    }
}

/// Induction motor carrying the head of an axis back and forth. While its
/// power and select lines are high the axis limits only report taps.
#[derive(Debug, Clone, Copy)]
struct SimInduction {
    power: PinId,
    select: PinId,
    axis: usize,
}

#[derive(Debug, Clone, Copy)]
struct ActiveTap {
    pin: PinId,
    start: Duration,
}

#[derive(Debug)]
struct SimState {
    levels: HashMap<PinId, bool>,
    switch_pins: HashSet<PinId>,
    scripts: HashMap<PinId, Vec<(Duration, bool)>>,
    axes: Vec<SimAxis>,
    inductions: Vec<SimInduction>,
    taps: VecDeque<PinId>,
    active_tap: Option<ActiveTap>,
    tap_press: Duration,
    tap_release: Duration,
    tap_idle: Duration,
    limits_active_low: bool,
    last_write_at: Duration,
    writes: Vec<PinWrite>,
    failing: HashSet<PinId>,
}

impl SimState {
    fn scripted(&self, pin: PinId, now: Duration) -> bool {
        self.scripts
            .get(&pin)
            .and_then(|edges| edges.iter().rev().find(|(at, _)| *at <= now))
            .is_some_and(|(_, pressed)| *pressed)
    }

    fn sweeping(&self, axis: usize) -> bool {
        let high = |p: PinId| self.levels.get(&p).copied().unwrap_or(false);
        self.inductions
            .iter()
            .any(|m| m.axis == axis && high(m.power) && high(m.select))
    }

    fn positional(&self, pin: PinId) -> bool {
        self.axes
            .iter()
            .enumerate()
            .any(|(i, a)| a.presses(pin) && !self.sweeping(i))
    }

    fn tapped(&mut self, pin: PinId, now: Duration) -> bool {
        if let Some(tap) = self.active_tap
            && now.saturating_sub(tap.start) >= self.tap_press + self.tap_release
        {
            self.active_tap = None;
        }
        if self.active_tap.is_none()
            && self.taps.front() == Some(&pin)
            && now.saturating_sub(self.last_write_at) >= self.tap_idle
        {
            self.taps.pop_front();
            self.active_tap = Some(ActiveTap { pin, start: now });
            trace!(pin, at_ms = now.as_millis() as u64, "simulated operator tap");
        }
        // The read that starts a tap still sees the switch released.
        self.active_tap.is_some_and(|t| {
            let held = now.saturating_sub(t.start);
            t.pin == pin && !held.is_zero() && held < self.tap_press
        })
    }

    fn advance_relays(&mut self) {
        let levels = &self.levels;
        for axis in &mut self.axes {
            if let SimDrive::Relay {
                increase,
                decrease,
                counter,
            } = &axis.drive
            {
                let inc = levels.get(increase).copied().unwrap_or(false);
                let dec = levels.get(decrease).copied().unwrap_or(false);
                if inc != dec {
                    let counter = counter.clone();
                    if axis.nudge(inc)
                        && let Some(c) = counter
                    {
                        c.pulse();
                    }
                }
            }
        }
    }

    fn on_write(&mut self, pin: PinId, high: bool) {
        let was_high = self.levels.get(&pin).copied().unwrap_or(false);
        let levels = &self.levels;
        if high && !was_high {
            for axis in &mut self.axes {
                if let SimDrive::Stepper {
                    step,
                    dir,
                    increasing_level,
                } = axis.drive
                    && step == pin
                {
                    let dir_level = levels.get(&dir).copied().unwrap_or(false);
                    axis.nudge(dir_level == increasing_level);
                }
            }
        }
        self.levels.insert(pin, high);
    }
}

/// Cloneable handle to a simulated rig; clones share the same state, so a
/// test can keep one while the controller owns another.
#[derive(Debug, Clone)]
pub struct SimulatedIo {
    state: Arc<Mutex<SimState>>,
    clock: VirtualClock,
}

impl SimulatedIo {
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                levels: HashMap::new(),
                switch_pins: HashSet::new(),
                scripts: HashMap::new(),
                axes: Vec::new(),
                inductions: Vec::new(),
                taps: VecDeque::new(),
                active_tap: None,
                tap_press: Duration::from_millis(100),
                tap_release: Duration::from_millis(100),
                tap_idle: Duration::from_millis(50),
                limits_active_low: false,
                last_write_at: Duration::ZERO,
                writes: Vec::new(),
                failing: HashSet::new(),
            })),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panic while holding the lock only happens inside a failing test;
        // keep serving the state so the original panic is the one reported.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    /// Switch inputs read low when pressed.
    pub fn set_limits_active_low(&self, active_low: bool) {
        self.lock().limits_active_low = active_low;
    }

    /// Script a switch as `(ms since start, pressed)` edges. Before the first
    /// edge the switch is released.
    pub fn script(&self, pin: PinId, edges: &[(u64, bool)]) {
        let mut st = self.lock();
        let mut v: Vec<(Duration, bool)> = edges
            .iter()
            .map(|(ms, p)| (Duration::from_millis(*ms), *p))
            .collect();
        v.sort_by_key(|(at, _)| *at);
        st.scripts.insert(pin, v);
        st.switch_pins.insert(pin);
    }

    /// Hold a switch pressed (or released) from now on.
    pub fn hold(&self, pin: PinId, pressed: bool) {
        let now = self.clock.elapsed();
        let mut st = self.lock();
        st.scripts.entry(pin).or_default().push((now, pressed));
        st.switch_pins.insert(pin);
    }

    /// Queue operator taps. Each tap starts once the controller polls that
    /// switch after `idle` without writing any output, reads pressed from
    /// the next poll on for `press` and then released for `release`.
    pub fn queue_taps(&self, pins: &[PinId], press: Duration, release: Duration, idle: Duration) {
        let mut st = self.lock();
        st.tap_press = press;
        st.tap_release = release;
        st.tap_idle = idle;
        for p in pins {
            st.taps.push_back(*p);
            st.switch_pins.insert(*p);
        }
    }

    pub fn pending_taps(&self) -> usize {
        self.lock().taps.len()
    }

    /// Add a positional axis; returns its index for [`Self::position`].
    pub fn add_axis(&self, axis: SimAxis) -> usize {
        let mut st = self.lock();
        st.switch_pins.insert(axis.min_limit);
        st.switch_pins.insert(axis.max_limit);
        st.axes.push(axis);
        st.axes.len() - 1
    }

    /// Attach an induction motor to axis `axis` (see [`Self::add_axis`]).
    pub fn add_induction(&self, power: PinId, select: PinId, axis: usize) {
        self.lock().inductions.push(SimInduction {
            power,
            select,
            axis,
        });
    }

    pub fn position(&self, axis: usize) -> Option<i64> {
        self.lock().axes.get(axis).map(|a| a.position)
    }

    /// Make every read of `pin` fail.
    pub fn fail_reads(&self, pin: PinId) {
        self.lock().failing.insert(pin);
    }

    /// All output writes so far, in order.
    pub fn writes(&self) -> Vec<PinWrite> {
        self.lock().writes.clone()
    }

    /// Levels written to `pin`, in order.
    pub fn writes_to(&self, pin: PinId) -> Vec<bool> {
        self.lock()
            .writes
            .iter()
            .filter(|w| w.pin == pin)
            .map(|w| w.high)
            .collect()
    }

    /// Last level written to (or forced on) an output pin.
    pub fn level(&self, pin: PinId) -> bool {
        self.lock().levels.get(&pin).copied().unwrap_or(false)
    }
}

impl DigitalIo for SimulatedIo {
    fn read_pin(&mut self, pin: PinId) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let now = self.clock.elapsed();
        let mut st = self.lock();
        if st.failing.contains(&pin) {
            return Err(Box::new(HwError::Gpio(format!("simulated read fault on pin {pin}"))));
        }
        st.advance_relays();
        if !st.switch_pins.contains(&pin) {
            return Ok(st.levels.get(&pin).copied().unwrap_or(false));
        }
        let pressed = st.positional(pin)
            || st.scripted(pin, now)
            || st.tapped(pin, now);
        Ok(pressed != st.limits_active_low)
    }

    fn write_pin(
        &mut self,
        pin: PinId,
        high: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let now = self.clock.elapsed();
        let mut st = self.lock();
        st.on_write(pin, high);
        st.last_write_at = now;
        st.writes.push(PinWrite { at: now, pin, high });
        Ok(())
    }
}
