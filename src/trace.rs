use chrono::{Local, SecondsFormat};
use tracing_subscriber::{
    filter::Targets,
    fmt::{self, time},
    prelude::*,
};
use yansi::Paint;

use crate::config::Log;

pub fn init(log: &Log) {
    let is_color = log.style.is_color();
    if !is_color {
        yansi::disable();
    }
    let filter = match parse_filter(&log.level) {
        Ok(filter) => filter,
        Err(err) => panic!("{}", err.red().bold()),
    };
    let format = fmt::layer()
        .with_timer(LocalTime)
        .with_ansi(is_color)
        .with_target(false);

    tracing_subscriber::registry()
        .with(format)
        .with(filter)
        .init();
}

fn parse_filter(level: &str) -> Result<Targets, String> {
    level
        .parse()
        .map_err(|e| format!("log level {} did not parse successfully: {}", level, e))
}

struct LocalTime;

impl time::FormatTime for LocalTime {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            Local::now().to_rfc3339_opts(SecondsFormat::Millis, false)
        )
    }
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn default_level_enables_crate_info() {
        let filter = parse_filter(&Log::default().level).unwrap();
        assert!(filter.would_enable("ipproxy::proxy", &Level::INFO));
        assert!(!filter.would_enable("ipproxy::proxy", &Level::DEBUG));
        assert!(!filter.would_enable("isahc", &Level::INFO));
    }

    #[test]
    fn bad_level_is_reported() {
        let err = parse_filter("ipproxy=loud").unwrap_err();
        assert!(err.contains("ipproxy=loud"));
    }
}
