use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use encore::{
    BackendKind, RenderSettings, ScenarioId, create_provider, op::FontBytes,
    scenarios::ScenarioCtx,
};

#[derive(Parser, Debug)]
#[command(name = "encore", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available scenarios.
    List,
    /// Record a scenario, replay it once, and write the snapshot PNG.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Scenario name (see `encore list`).
    #[arg(long)]
    scenario: String,

    /// Scenario size parameter; defaults to the scenario's quick size.
    #[arg(long)]
    size: Option<u64>,

    /// Backend to replay against.
    #[arg(long, value_enum, default_value_t = BackendChoice::Cpu)]
    backend: BackendChoice,

    /// Output directory for the snapshot.
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,

    /// Font file for the textblobs scenario (.ttf/.otf).
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BackendChoice {
    Cpu,
    #[cfg(feature = "gpu")]
    Gpu,
}

impl BackendChoice {
    fn kind(self) -> BackendKind {
        match self {
            BackendChoice::Cpu => BackendKind::Cpu,
            #[cfg(feature = "gpu")]
            BackendChoice::Gpu => BackendKind::Gpu,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::List => {
            for id in ScenarioId::all() {
                println!("{:32} (default size {})", id.name(), id.default_size());
            }
            Ok(())
        }
        Command::Render(args) => render(args),
    }
}

fn render(args: RenderArgs) -> anyhow::Result<()> {
    let id = ScenarioId::parse(&args.scenario)
        .with_context(|| format!("unknown scenario '{}' (try `encore list`)", args.scenario))?;
    let size = args.size.unwrap_or_else(|| id.default_size());

    let font = match &args.font {
        Some(path) => Some(FontBytes::new(
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?,
        )),
        None => None,
    };

    let settings = RenderSettings {
        clear_rgba: Some([255, 255, 255, 255]),
    };
    let mut provider = create_provider(args.backend.kind(), &settings)?;

    let workload = {
        let mut ctx = ScenarioCtx {
            provider: provider.as_mut(),
            font,
        };
        id.build(size, &mut ctx)?
    };

    provider.initialize_surface(workload.canvas_width, workload.canvas_height)?;
    workload.list.render_to(provider.surface()?)?;
    provider.flush_and_submit(true)?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create out dir '{}'", args.out_dir.display()))?;
    let out_path = args.out_dir.join(workload.snapshot_name(provider.backend_name()));
    provider.snapshot(&out_path)?;

    println!(
        "{} ops={} bounds={:?} -> {}",
        workload.snapshot_name(provider.backend_name()),
        workload.list.len(),
        workload.list.bounds(),
        out_path.display()
    );
    Ok(())
}
