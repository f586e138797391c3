use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

use crate::Error;

/// Filter directives, e.g. `info` or `omt_lite=debug`.
const ENV_FILTER: &str = "OMT_LOG";

/// Overrides the directory the `logs` folder is created in.
const ENV_STORAGE: &str = "OMT_STORAGE_PATH";

const DEFAULT_FILTER: &str = "info";

struct Logger {
	filter: reload::Handle<EnvFilter, Registry>,
	sink: FileSink,
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

fn logger() -> &'static Logger {
	LOGGER.get_or_init(|| {
		let sink = FileSink::new(default_path());

		let filter = EnvFilter::try_from_env(ENV_FILTER).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
		let (filter, handle) = reload::Layer::new(filter);

		let fmt_layer = tracing_subscriber::fmt::layer()
			.with_ansi(false)
			.with_writer(sink.clone());

		// A subscriber installed by the host application wins.
		let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();

		Logger { filter: handle, sink }
	})
}

/// Install the subscriber on first use.
pub fn init() {
	logger();
}

/// Log to `path` from now on, or stop logging to a file with `None`.
pub fn set_file(path: Option<PathBuf>) {
	logger().sink.set_path(path);
}

/// Replace the filter, e.g. `debug` or `warn,omt_lite=trace`.
pub fn set_filter(directives: &str) -> Result<(), Error> {
	let filter = EnvFilter::try_new(directives)?;
	logger().filter.reload(filter)?;
	Ok(())
}

fn default_path() -> Option<PathBuf> {
	let storage = match std::env::var_os(ENV_STORAGE) {
		Some(dir) => PathBuf::from(dir),
		None => default_storage()?,
	};

	Some(storage.join("logs").join(format!("{}.log", process_name())))
}

#[cfg(windows)]
fn default_storage() -> Option<PathBuf> {
	std::env::var_os("ProgramData").map(|dir| PathBuf::from(dir).join("OMT"))
}

#[cfg(not(windows))]
fn default_storage() -> Option<PathBuf> {
	std::env::var_os("HOME").map(|dir| PathBuf::from(dir).join(".OMT"))
}

fn process_name() -> String {
	std::env::current_exe()
		.ok()
		.and_then(|exe| exe.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
		.unwrap_or_else(|| "libomt".to_string())
}

#[derive(Default)]
struct SinkState {
	path: Option<PathBuf>,
	file: Option<File>,

	// Set after a failed open so we don't retry on every line.
	failed: bool,
}

/// Appends formatted lines to a file, opened on the first write.
///
/// I/O errors are dropped: logging must never fail a call.
#[derive(Clone)]
struct FileSink {
	state: Arc<Mutex<SinkState>>,
}

impl FileSink {
	fn new(path: Option<PathBuf>) -> Self {
		let state = SinkState {
			path,
			..Default::default()
		};
		Self {
			state: Arc::new(Mutex::new(state)),
		}
	}

	fn set_path(&self, path: Option<PathBuf>) {
		let mut state = self.state.lock();
		state.path = path;
		state.file = None;
		state.failed = false;
	}

	fn append(&self, buf: &[u8]) {
		let mut state = self.state.lock();

		if state.file.is_none() && !state.failed {
			state.file = state.path.as_deref().and_then(open);
			state.failed = state.path.is_some() && state.file.is_none();
		}

		if let Some(file) = state.file.as_mut() {
			if file.write_all(buf).is_err() {
				state.file = None;
				state.failed = true;
			}
		}
	}
}

fn open(path: &Path) -> Option<File> {
	if let Some(parent) = path.parent() {
		let _ = std::fs::create_dir_all(parent);
	}

	OpenOptions::new().create(true).append(true).open(path).ok()
}

impl io::Write for FileSink {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.append(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

impl<'a> MakeWriter<'a> for FileSink {
	type Writer = FileSink;

	fn make_writer(&'a self) -> Self::Writer {
		self.clone()
	}
}
