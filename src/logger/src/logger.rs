use std::io::Write;

use env_logger::fmt::Color;
use env_logger::{Builder, Env};
use log::{Level, LevelFilter};

/// Initialize the global logger.
///
/// Verbosity maps `0..=4` to `Error..=Trace`; the `AODP_LOG` environment
/// variable overrides the filter. Error records carry a file:line traceback.
pub fn init(verbosity: u8) {
    let env = Env::default().filter("AODP_LOG");

    Builder::new()
        .filter_level(u8_to_loglevel(verbosity))
        .format(|buf, record| {
            let traceback = if record.level() == Level::Error {
                format!("(@ {}:{}) ", record.file().unwrap_or("unknown"), record.line().unwrap_or(0))
            } else {
                String::new()
            };

            let mut level_style = buf.style();
            let color = match record.level() {
                Level::Error => Color::Red,
                Level::Warn => Color::Yellow,
                Level::Info => Color::Green,
                Level::Debug => Color::Blue,
                Level::Trace => Color::Cyan,
            };
            level_style.set_color(color).set_bold(true);

            writeln!(
                buf,
                "[{} {: <5} {}] {traceback}{}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                level_style.value(record.level()),
                record.target(),
                record.args()
            )
        })
        .parse_env(env)
        .try_init()
        .ok(); // a second initialization (tests) is harmless
}

pub fn set_level(verbosity: u8) {
    log::set_max_level(u8_to_loglevel(verbosity));
}

fn u8_to_loglevel(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        4..=u8::MAX => LevelFilter::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level() {
        init(0);
        for level in 0..u8::MAX {
            set_level(level);

            let expected_level = match level {
                0 => LevelFilter::Error,
                1 => LevelFilter::Warn,
                2 => LevelFilter::Info,
                3 => LevelFilter::Debug,
                4..=u8::MAX => LevelFilter::Trace,
            };

            assert_eq!(log::max_level(), expected_level);
        }
    }
}
