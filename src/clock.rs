use chrono::{DateTime, Local, TimeZone, Timelike};
use std::time::Duration;

/// Canned question the clock widget submits when activated.
pub const DATE_TIME_PROMPT: &str = "What's the current date and time?";

/// Ambient wall-clock display source, decoupled from session state.
///
/// `now` stays `None` until `mount()` so a value is never produced during
/// initial construction; ticks are re-aligned to whole-second boundaries on
/// every beat instead of drifting from mount time.
#[derive(Debug)]
pub struct WidgetClock {
    now: Option<DateTime<Local>>,
    locale: String,
    timezone: String,
}

impl WidgetClock {
    pub fn new(locale: String, timezone: String) -> Self {
        Self {
            now: None,
            locale,
            timezone,
        }
    }

    pub fn now(&self) -> Option<DateTime<Local>> {
        self.now
    }

    pub fn is_mounted(&self) -> bool {
        self.now.is_some()
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    /// Takes the first reading and returns the delay until the next
    /// whole-second boundary, when the first tick is due.
    pub fn mount(&mut self) -> Duration {
        let now = Local::now();
        self.now = Some(now);
        delay_to_next_second(&now)
    }

    /// One scheduled beat: refresh the reading and report the delay to the
    /// next aligned tick.
    pub fn tick(&mut self) -> (DateTime<Local>, Duration) {
        let now = Local::now();
        self.now = Some(now);
        (now, delay_to_next_second(&now))
    }

    /// Out-of-schedule refresh. No-op before mount.
    pub fn refresh(&mut self) -> Option<DateTime<Local>> {
        self.now?;
        let now = Local::now();
        self.now = Some(now);
        Some(now)
    }

    /// Locale changed at runtime: force an immediate refresh, independent of
    /// the tick schedule.
    pub fn set_locale(&mut self, locale: String) -> Option<DateTime<Local>> {
        if locale == self.locale {
            return None;
        }
        self.locale = locale;
        self.refresh()
    }

    pub fn set_timezone(&mut self, timezone: String) -> Option<DateTime<Local>> {
        if timezone == self.timezone {
            return None;
        }
        self.timezone = timezone;
        self.refresh()
    }
}

/// Milliseconds remaining until the displayed second rolls over. A reading
/// taken exactly on the boundary waits a full second.
pub fn delay_to_next_second<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    let subsec_millis = u64::from(now.nanosecond() / 1_000_000) % 1_000;
    Duration::from_millis(1_000 - subsec_millis)
}
