use std::fmt::{self, Display};

use log::Level;

/// External crates only get to log warnings and errors
const ALLOWED_EXTERNAL_LEVELS: [Level; 2] = [Level::Warn, Level::Error];

/// Log levels used by the kickabout crates
const ALLOWED_LEVELS: [Level; 3] = [Level::Info, Level::Warn, Level::Error];

/// Starts logging to the given file.
/// The terminal is in raw mode while the app runs, so stdout is off limits.
pub fn init_logger(path: &str) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let target = Target::from_str(record.target());
            let now = chrono::Local::now();

            out.finish(format_args!(
                "{:<3} {} {:^8} {}",
                level_label(record.level()),
                now.format("%H:%M:%S"),
                target,
                message
            ))
        })
        .filter(|metadata| {
            let target = Target::from_str(metadata.target());

            let is_allowed = ALLOWED_LEVELS.contains(&metadata.level());
            let is_severe = ALLOWED_EXTERNAL_LEVELS.contains(&metadata.level());

            target.is_local() && is_allowed || is_severe
        })
        .chain(fern::log_file(path)?)
        .apply()?;

    Ok(())
}

enum Target {
    External(String),
    App,
    Client,
    Backend,
    Core,
}

impl Target {
    fn from_str(str: &str) -> Self {
        let mut split = str.split("::");
        let module = split.next().unwrap_or_default();

        match module {
            "kickabout_app" => Self::App,
            "kickabout_client" => Self::Client,
            "kickabout_backend" => Self::Backend,
            "kickabout_core" => Self::Core,
            external => Self::External(external.to_string()),
        }
    }

    fn is_local(&self) -> bool {
        !matches!(self, Self::External(_))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::External(name) => name.as_str(),
            Self::App => "APP",
            Self::Client => "CLIENT",
            Self::Backend => "BACKEND",
            Self::Core => "CORE",
        };

        Display::fmt(name, f)
    }
}

fn level_label(level: Level) -> &'static str {
    match level {
        Level::Error => "ERR",
        Level::Warn => "WRN",
        Level::Info => "INF",
        Level::Debug => "DBG",
        Level::Trace => "TRC",
    }
}
