use clap::Parser;

use rbac_eval::Args;

fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	rbac_eval::run(args)
}
