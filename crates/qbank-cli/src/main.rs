mod answers_cmd;
mod append_cmd;
mod attach_cmd;
mod cli;
mod config;
mod crop_cmd;
mod distribute_cmd;
mod export_cmd;
mod images_cmd;
mod latex_cmd;
mod manifest;
mod page_range;
mod probe_cmd;
mod render_cmd;
mod segment_cmd;
mod shared;
mod stitch_cmd;
mod validate_cmd;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use shared::Context;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn context(cli: &Cli) -> Result<Context, i32> {
    let config = Config::load(cli.config.as_deref()).map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;
    let mut paths = config.path_config();
    if let Some(dir) = &cli.public_dir {
        paths.public_dir = dir.clone();
    }
    Ok(Context {
        config,
        paths,
        backup: cli.backup,
    })
}

fn run(cli: Cli) -> Result<(), i32> {
    let ctx = context(&cli)?;

    match cli.command {
        Commands::Probe { ref file, ref format } => probe_cmd::run(file, format),
        Commands::Render {
            ref file,
            ref out,
            ref pages,
            scale,
        } => render_cmd::run(file, out, pages.as_deref(), scale, &ctx),
        Commands::Segment {
            ref dir,
            ref out,
            ref bank,
            ref title,
            gap,
            min_height,
            skip_top,
            skip_bottom,
        } => {
            let overrides = segment_cmd::ScanOverrides {
                gap,
                min_height,
                skip_top,
                skip_bottom,
            };
            segment_cmd::run(dir, out, bank.as_deref(), title, overrides, &ctx)
        }
        Commands::Crop {
            ref manifest,
            ref bank,
            dry_run,
        } => crop_cmd::run(manifest, bank.as_deref(), dry_run, &ctx),
        Commands::Stitch { ref parts, ref out } => stitch_cmd::run(parts, out),
        Commands::Append {
            ref bank,
            ref drafts,
            ref subject,
            section,
        } => append_cmd::run(bank, drafts, subject, section.to_question_type(), &ctx),
        Commands::AttachImages {
            ref bank,
            ref assignments,
        } => attach_cmd::run(bank, assignments, &ctx),
        Commands::Answers {
            ref bank,
            ref from,
            reset,
            ref value,
        } => answers_cmd::run(bank, from.as_deref(), reset, value.as_deref(), &ctx),
        Commands::Latex {
            ref bank,
            pass,
            dry_run,
        } => latex_cmd::run(bank, pass.to_pass(), dry_run, &ctx),
        Commands::Distribute {
            ref bank,
            ref subjects,
            per_subject,
            mcq,
        } => distribute_cmd::run(bank, subjects, per_subject, mcq, &ctx),
        Commands::Validate { ref bank, ref format } => validate_cmd::run(bank, format),
        Commands::Images { ref bank, prune } => images_cmd::run(bank, prune, &ctx),
        Commands::Export {
            ref bank,
            ref out,
            embed,
            ref copy_images,
        } => export_cmd::run(bank, out, embed, copy_images.as_deref(), &ctx),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(code) = run(cli) {
        std::process::exit(code);
    }
}
