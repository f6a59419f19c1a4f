mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use fern::colors::{Color, ColoredLevelConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;

fn main() -> Result<()> {
	let cli = Cli::parse();

	let progress = match cli.quiet {
		true => None,
		false => {
			let bar = ProgressBar::new(0);
			bar.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} [{elapsed_precise}] {msg}")?);
			Some(bar)
		}
	};
	setup_logging(cli.log_level(), progress.clone())?;

	let summary = layer_export::export_file(&cli.input, &cli.output_dir, cli.export_options(), |report| {
		if let Some(bar) = &progress {
			bar.set_length(report.total as u64);
			bar.set_position(report.completed as u64);
			bar.set_message(report.combination.bitstring());
		}
	})
	.with_context(|| format!("Failed to export the layers of {:?}", cli.input))?;

	if let Some(bar) = progress {
		bar.finish_and_clear();
	}

	println!("Wrote {} images to {:?}", summary.written.len(), cli.output_dir);
	if !summary.skipped.is_empty() {
		let skipped = summary.skipped.iter().map(|(combination, _)| combination.bitstring()).collect::<Vec<_>>();
		println!("Skipped {} combinations that failed to render: {}", skipped.len(), skipped.join(", "));
	}

	Ok(())
}

fn setup_logging(level: log::LevelFilter, progress: Option<ProgressBar>) -> Result<()> {
	let colors = ColoredLevelConfig::new().debug(Color::Magenta).info(Color::Green).warn(Color::Yellow).error(Color::Red);

	fern::Dispatch::new()
		.chain(fern::Output::call(move |record| write_log_line(progress.as_ref(), &mut std::io::stderr(), &record.args().to_string())))
		.level(level)
		.format(move |out, message, record| out.finish(format_args!("[{}]{} {}", colors.color(record.level()), chrono::Utc::now().format("[%Y-%m-%d %H:%M:%S]"), message)))
		.apply()
		.context("Failed to install the logger")
}

/// Writes one log line, taking the progress bar off the terminal while doing so.
fn write_log_line(progress: Option<&ProgressBar>, output: &mut impl Write, line: &str) {
	// Nowhere left to report a failed write to stderr
	let mut write = || {
		let _ = writeln!(output, "{line}");
	};

	match progress {
		Some(bar) => bar.suspend(write),
		None => write(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use indicatif::ProgressDrawTarget;
	use pretty_assertions::assert_eq;

	#[test]
	fn log_lines_are_written_while_the_bar_is_live() {
		let bar = ProgressBar::with_draw_target(Some(4), ProgressDrawTarget::hidden());
		bar.set_position(2);
		let mut output = Vec::new();

		write_log_line(Some(&bar), &mut output, "[WARN] Skipping combination 01");
		write_log_line(None, &mut output, "[INFO] Exported 3 of 4 images");

		assert_eq!(String::from_utf8(output).unwrap(), "[WARN] Skipping combination 01\n[INFO] Exported 3 of 4 images\n");
		assert_eq!(bar.position(), 2);
		assert!(!bar.is_finished());
	}
}
