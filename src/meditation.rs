//! Guided meditation timer.
//!
//! A program is a fixed list of sections, each with a duration and an audio
//! cue. [`MeditationTimer`] is a plain state machine advanced by calling
//! [`MeditationTimer::tick`] once per second; it owns no clock and spawns
//! nothing, so the caller decides how ticks are driven.

use serde::{Deserialize, Serialize};

/// Which sound marks the start of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    LowBell,
    TransitionUp,
    EnergyRise,
    Inspiration,
    Transformation,
    Completion,
}

impl Cue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowBell => "low_bell",
            Self::TransitionUp => "transition_up",
            Self::EnergyRise => "energy_rise",
            Self::Inspiration => "inspiration",
            Self::Transformation => "transformation",
            Self::Completion => "completion",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: &'static str,
    pub duration_secs: u32,
    pub description: &'static str,
    pub cue: Cue,
}

/// The six-part identity transformation meditation (32 minutes).
pub const IDENTITY_TRANSFORMATION: &[Section] = &[
    Section {
        name: "Entering the Present Moment",
        duration_secs: 360,
        description: "Sit comfortably. Close your eyes. Place hands loosely on legs. Begin with deep breathing.",
        cue: Cue::LowBell,
    },
    Section {
        name: "Recognizing the Old Self",
        duration_secs: 240,
        description: "Acknowledge old patterns that no longer serve you. Feel the weight of the old self.",
        cue: Cue::TransitionUp,
    },
    Section {
        name: "Breathing Energy Into Possibility",
        duration_secs: 240,
        description: "Draw energy up your spine, charging your body with new possibilities.",
        cue: Cue::EnergyRise,
    },
    Section {
        name: "Rehearsing the New Self",
        duration_secs: 600,
        description: "Visualize yourself embodying your chosen qualities. Amplify elevated emotions.",
        cue: Cue::Inspiration,
    },
    Section {
        name: "Becoming That Identity",
        duration_secs: 300,
        description: "Anchor the new self into your body and mind. Merge with your new identity.",
        cue: Cue::Transformation,
    },
    Section {
        name: "Closing with Gratitude",
        duration_secs: 180,
        description: "Lock in the transformation with genuine gratitude. Return to the room.",
        cue: Cue::Completion,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Finished,
}

/// What happened on a tick (or on start).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// One second elapsed inside the current section.
    Tick { section: usize, remaining: u32 },
    /// A new section began; its cue should play.
    SectionChanged { section: usize, cue: Cue },
    /// The last section ran out.
    Finished,
    /// Nothing to do: the timer is idle, paused or already finished.
    Idle,
}

#[derive(Debug, Clone)]
pub struct MeditationTimer {
    sections: &'static [Section],
    state: TimerState,
    current: usize,
    remaining: u32,
}

impl Default for MeditationTimer {
    fn default() -> Self {
        Self::new(IDENTITY_TRANSFORMATION)
    }
}

impl MeditationTimer {
    pub fn new(sections: &'static [Section]) -> Self {
        Self {
            sections,
            state: TimerState::Idle,
            current: 0,
            remaining: 0,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn sections(&self) -> &'static [Section] {
        self.sections
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_section(&self) -> Option<&'static Section> {
        match self.state {
            TimerState::Running | TimerState::Paused => self.sections.get(self.current),
            _ => None,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn total_duration(&self) -> u32 {
        self.sections.iter().map(|s| s.duration_secs).sum()
    }

    /// Seconds elapsed since start, across sections.
    pub fn elapsed(&self) -> u32 {
        match self.state {
            TimerState::Idle => 0,
            TimerState::Finished => self.total_duration(),
            TimerState::Running | TimerState::Paused => {
                let done: u32 = self.sections[..self.current]
                    .iter()
                    .map(|s| s.duration_secs)
                    .sum();
                done + self.sections[self.current].duration_secs - self.remaining
            }
        }
    }

    /// Start from the first section. Does nothing while already running or paused.
    pub fn start(&mut self) -> TimerEvent {
        if matches!(self.state, TimerState::Running | TimerState::Paused) {
            return TimerEvent::Idle;
        }
        let Some(first) = self.sections.first() else {
            self.state = TimerState::Finished;
            return TimerEvent::Finished;
        };

        self.state = TimerState::Running;
        self.current = 0;
        self.remaining = first.duration_secs;
        TimerEvent::SectionChanged {
            section: 0,
            cue: first.cue,
        }
    }

    /// Toggle between running and paused. No effect otherwise.
    pub fn pause_resume(&mut self) {
        self.state = match self.state {
            TimerState::Running => TimerState::Paused,
            TimerState::Paused => TimerState::Running,
            other => other,
        };
    }

    pub fn stop(&mut self) {
        self.state = TimerState::Idle;
        self.current = 0;
        self.remaining = 0;
    }

    /// Advance one second.
    ///
    /// A section whose countdown reached zero hands over to the next one on the
    /// following tick; after the last section the timer finishes.
    pub fn tick(&mut self) -> TimerEvent {
        if self.state != TimerState::Running {
            return TimerEvent::Idle;
        }

        if self.remaining > 0 {
            self.remaining -= 1;
            return TimerEvent::Tick {
                section: self.current,
                remaining: self.remaining,
            };
        }

        self.current += 1;
        match self.sections.get(self.current) {
            Some(next) => {
                self.remaining = next.duration_secs;
                TimerEvent::SectionChanged {
                    section: self.current,
                    cue: next.cue,
                }
            }
            None => {
                self.state = TimerState::Finished;
                self.current = self.sections.len() - 1;
                self.remaining = 0;
                TimerEvent::Finished
            }
        }
    }
}

/// `MM:SS` display of a second count.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: &[Section] = &[
        Section {
            name: "one",
            duration_secs: 2,
            description: "",
            cue: Cue::LowBell,
        },
        Section {
            name: "two",
            duration_secs: 1,
            description: "",
            cue: Cue::Completion,
        },
    ];

    #[test]
    fn identity_program_totals_32_minutes() {
        let timer = MeditationTimer::default();
        assert_eq!(timer.sections().len(), 6);
        assert_eq!(timer.total_duration(), 32 * 60);
    }

    #[test]
    fn runs_through_all_sections() {
        let mut timer = MeditationTimer::new(SHORT);
        assert_eq!(
            timer.start(),
            TimerEvent::SectionChanged {
                section: 0,
                cue: Cue::LowBell
            }
        );
        assert_eq!(timer.tick(), TimerEvent::Tick { section: 0, remaining: 1 });
        assert_eq!(timer.tick(), TimerEvent::Tick { section: 0, remaining: 0 });
        assert_eq!(timer.elapsed(), 2);
        assert_eq!(
            timer.tick(),
            TimerEvent::SectionChanged {
                section: 1,
                cue: Cue::Completion
            }
        );
        assert_eq!(timer.current_section().unwrap().name, "two");
        assert_eq!(timer.tick(), TimerEvent::Tick { section: 1, remaining: 0 });
        assert_eq!(timer.tick(), TimerEvent::Finished);
        assert_eq!(timer.state(), TimerState::Finished);
        assert_eq!(timer.elapsed(), 3);
        assert_eq!(timer.tick(), TimerEvent::Idle);
    }

    #[test]
    fn pause_freezes_countdown() {
        let mut timer = MeditationTimer::new(SHORT);
        timer.start();
        timer.pause_resume();
        assert_eq!(timer.state(), TimerState::Paused);
        assert_eq!(timer.tick(), TimerEvent::Idle);
        assert_eq!(timer.remaining(), 2);

        timer.pause_resume();
        assert_eq!(timer.tick(), TimerEvent::Tick { section: 0, remaining: 1 });
    }

    #[test]
    fn pause_before_start_is_ignored() {
        let mut timer = MeditationTimer::new(SHORT);
        timer.pause_resume();
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[test]
    fn stop_resets_and_allows_restart() {
        let mut timer = MeditationTimer::new(SHORT);
        timer.start();
        timer.tick();
        timer.stop();
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.elapsed(), 0);
        assert!(timer.current_section().is_none());

        assert!(matches!(timer.start(), TimerEvent::SectionChanged { section: 0, .. }));
        assert_eq!(timer.start(), TimerEvent::Idle);
    }

    #[test]
    fn empty_program_finishes_immediately() {
        let mut timer = MeditationTimer::new(&[]);
        assert_eq!(timer.start(), TimerEvent::Finished);
        assert_eq!(timer.state(), TimerState::Finished);
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(360), "06:00");
        assert_eq!(format_clock(599), "09:59");
    }
}
