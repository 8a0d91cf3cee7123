use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Result, Write as IoWrite},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    sync::{LazyLock, Mutex},
    thread,
    time::Duration,
};

use chrono::Local;
use colored::{ColoredString, Colorize, control::ShouldColorize};
use gfxbuild_utils::constants::LOG_DIR;
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use log::{Level, LevelFilter, Record, warn};
use log4rs::{
    Config, Logger as L4RSLogger,
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::{
            RollingFileAppender,
            policy::compound::{
                CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
            },
        },
    },
    config::{Appender, Root},
    encode::{Encode, Write, pattern::PatternEncoder},
};
use nu_ansi_term::Color;
use private::Private;
use rand::Rng;

mod private {
    pub trait Private {}
}

impl Private for Command {}

static MULTI_PROGRESS: LazyLock<MultiProgress> = LazyLock::new(MultiProgress::new);
static LOG_DIR_PATH: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

#[derive(Debug, Clone)]
pub struct Logger {
    level: LevelFilter,
    log_dir: Option<PathBuf>,
}

impl Logger {
    const TRIGGER_FILE_SIZE: u64 = 64 * 1024;
    const ARCHIVE_FILENAME_PATTERN: &'static str = "gfxbuild.{}.log";
    const LOG_FILENAME: &'static str = "gfxbuild.log";
    const LOG_FILE_COUNT: u32 = 4;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn filter_level(&mut self, filter_level: LevelFilter) -> &mut Self {
        self.level = filter_level;
        self
    }

    pub fn log_out_dir<P>(&mut self, path: Option<P>) -> &mut Self
    where
        P: AsRef<Path>,
    {
        self.log_dir = path.map(|p| p.as_ref().to_path_buf());
        self
    }

    /// Initializes logging for the application.
    ///
    /// Logs always go to stderr. A rolling log file is added when the
    /// log directory can be created; if it can't, logging continues on
    /// stderr only.
    ///
    /// # Panics
    /// Will panic if logging has already been initialized.
    pub fn init(&self) {
        let log_dir = self.log_dir.clone().or_else(|| {
            gfxbuild_utils::home_dir().map(|home| home.join(LOG_DIR))
        });

        let stderr = ConsoleAppender::builder()
            .encoder(Box::new(CustomPatternEncoder))
            .target(Target::Stderr)
            .build();

        let mut config =
            Config::builder().appender(Appender::builder().build("stderr", Box::new(stderr)));
        let mut root = Root::builder().appender("stderr");

        if let Some(log_dir) = log_dir {
            match Self::file_appender(&log_dir) {
                Ok(file_appender) => {
                    config = config
                        .appender(Appender::builder().build("file", Box::new(file_appender)));
                    root = root.appender("file");

                    if let Ok(mut lock) = LOG_DIR_PATH.lock() {
                        *lock = Some(log_dir);
                    }
                }
                Err(e) => eprintln!("Cannot create log file in {}:\n{e}", log_dir.display()),
            }
        }

        let config = config
            .build(root.build(self.level))
            .expect("Logger config should build");

        LogWrapper::new(MULTI_PROGRESS.clone(), L4RSLogger::new(config))
            .try_init()
            .expect("LogWrapper should initialize");
    }

    fn file_appender(log_dir: &Path) -> anyhow::Result<RollingFileAppender> {
        let log_archive_pattern =
            format!("{}/{}", log_dir.display(), Self::ARCHIVE_FILENAME_PATTERN);
        let window_roller =
            FixedWindowRoller::builder().build(&log_archive_pattern, Self::LOG_FILE_COUNT)?;

        Ok(RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{d} - {l} - {m}{n}")))
            .build(
                log_dir.join(Self::LOG_FILENAME),
                Box::new(CompoundPolicy::new(
                    Box::new(SizeTrigger::new(Self::TRIGGER_FILE_SIZE)),
                    Box::new(window_roller),
                )),
            )?)
    }

    pub fn multi_progress() -> MultiProgress {
        MULTI_PROGRESS.clone()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            log_dir: None,
        }
    }
}

trait ColoredLevel {
    fn colored(&self) -> ColoredString;
}

impl ColoredLevel for Level {
    fn colored(&self) -> ColoredString {
        match self {
            Self::Error => Self::Error.as_str().red(),
            Self::Warn => Self::Warn.as_str().yellow(),
            Self::Info => Self::Info.as_str().green(),
            Self::Debug => Self::Debug.as_str().blue(),
            Self::Trace => Self::Trace.as_str().cyan(),
        }
    }
}

pub trait CommandLogging: Private {
    /// Runs the command, printing each line of stdout/stderr behind a
    /// colored image ref and a progress spinner. The raw output is also
    /// written to `<image_ref>.log` in the log directory.
    ///
    /// # Errors
    /// Will error if there was an issue executing the process.
    fn build_status<T, U>(self, image_ref: T, message: U) -> Result<ExitStatus>
    where
        T: AsRef<str>,
        U: AsRef<str>;
}

impl CommandLogging for Command {
    fn build_status<T, U>(self, image_ref: T, message: U) -> Result<ExitStatus>
    where
        T: AsRef<str>,
        U: AsRef<str>,
    {
        let image_ref = image_ref.as_ref();
        let log_file = LOG_DIR_PATH
            .lock()
            .ok()
            .and_then(|lock| lock.clone())
            .map(|dir| dir.join(format!("{}.log", image_ref.replace(['/', ':', '.'], "_"))))
            .and_then(|path| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .inspect_err(|e| warn!("Failed to open build log {}: {e}", path.display()))
                    .ok()
            });

        stream_status(
            self,
            image_ref,
            &format!("{} {image_ref}", message.as_ref()),
            log_file,
        )
    }
}

fn stream_status(
    mut command: Command,
    header: &str,
    message: &str,
    log_file: Option<File>,
) -> Result<ExitStatus> {
    let header = color_str(header, gen_random_ansi_color());
    let (reader, writer) = os_pipe::pipe()?;

    command
        .stdout(writer.try_clone()?)
        .stderr(writer)
        .stdin(Stdio::null());

    let progress =
        Logger::multi_progress().add(ProgressBar::new_spinner().with_message(message.to_string()));
    progress.enable_steady_tick(Duration::from_millis(100));

    let mut child = command.spawn()?;

    // The `Command` holds the write end of the pipe, the reader
    // won't see EOF until it's dropped.
    drop(command);

    let printer = thread::spawn(move || {
        let mp = Logger::multi_progress();
        let mut log_file = log_file;

        for line in BufReader::new(reader).lines().map_while(std::result::Result::ok) {
            let text = format!("{prefix} {line}", prefix = log_header(&header));
            if mp.is_hidden() {
                eprintln!("{text}");
            } else if mp.println(&text).is_err() {
                eprintln!("{text}");
            }

            if let Some(file) = log_file.as_mut()
                && let Err(e) = writeln!(file, "{line}")
            {
                warn!("Failed to write to build log: {e}");
                log_file = None;
            }
        }
    });

    let status = child.wait()?;
    if printer.join().is_err() {
        warn!("Output printer thread panicked");
    }

    progress.finish_and_clear();
    Logger::multi_progress().remove(&progress);

    Ok(status)
}

#[derive(Debug)]
struct CustomPatternEncoder;

impl Encode for CustomPatternEncoder {
    fn encode(&self, w: &mut dyn Write, record: &Record) -> anyhow::Result<()> {
        let level = match log::max_level() {
            LevelFilter::Off => return Ok(()),
            LevelFilter::Trace => format!(
                "{level:width$} {module}:{line}",
                level = record.level().colored(),
                width = 5,
                module = record.module_path().unwrap_or_default().bright_yellow(),
                line = record
                    .line()
                    .map_or_else(String::new, |l| l.to_string())
                    .bright_green(),
            ),
            _ => format!("{level:width$}", level = record.level().colored(), width = 5),
        };

        Ok(writeln!(
            w,
            "{prefix} {args}",
            prefix = log_header(level),
            args = record.args(),
        )?)
    }
}

/// Keeps the style of logs consistent between
/// normal log use and command output.
fn log_header<T>(text: T) -> String
where
    T: AsRef<str>,
{
    let text = text.as_ref();
    match log::max_level() {
        LevelFilter::Off => String::new(),
        LevelFilter::Error | LevelFilter::Warn | LevelFilter::Info => {
            format!("{text} {sep}", sep = "=>".bold())
        }
        LevelFilter::Debug | LevelFilter::Trace => format!(
            "[{time} {text}] {sep}",
            time = Local::now().format("%H:%M:%S"),
            sep = "=>".bold(),
        ),
    }
}

#[must_use]
pub fn gen_random_ansi_color() -> u8 {
    // ANSI extended color range
    // https://www.ditig.com/publications/256-colors-cheat-sheet
    const LOW_END: u8 = 21;
    const HIGH_END: u8 = 230;

    rand::rng().random_range(LOW_END..=HIGH_END)
}

pub fn color_str<T>(text: T, ansi_color: u8) -> String
where
    T: AsRef<str>,
{
    if ShouldColorize::from_env().should_colorize() {
        Color::Fixed(ansi_color).paint(text.as_ref()).to_string()
    } else {
        text.as_ref().to_string()
    }
}
