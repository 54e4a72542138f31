use clap::builder::{
	Styles,
	styling::{AnsiColor, Effects},
};
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("CARGO_PKG_NAME"));

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

/// Installs a stderr subscriber filtered by `log_level`, an `EnvFilter` directive string.
pub fn init_tracing(log_level: &str) -> color_eyre::Result<()> {
	let filter = EnvFilter::try_new(log_level)
		.map_err(|err| eyre::eyre!("Log level {log_level:?} is not a valid filter: {err}."))?;

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.try_init()
		.map_err(|err| eyre::eyre!("Tracing is already initialized: {err}."))
}
