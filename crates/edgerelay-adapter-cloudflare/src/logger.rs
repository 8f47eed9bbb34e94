use log::{Level, LevelFilter, Log, Metadata, Record};

/// Writes records to the Workers console, where `wrangler tail` picks them up.
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error => worker::console_error!("[{}] {}", record.target(), record.args()),
            Level::Warn => worker::console_warn!("[{}] {}", record.target(), record.args()),
            level => worker::console_log!("{} [{}] {}", level, record.target(), record.args()),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Installs the console logger. An isolate serves many requests, so repeated calls only adjust
/// the level.
pub fn init_logger(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
