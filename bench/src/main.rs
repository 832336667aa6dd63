use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::Context as _;
use serde_json::json;
use sha2::Digest as _;

use encore::{
    BackendKind, RenderSettings, ScenarioId, create_provider, op::FontBytes,
    scenarios::ScenarioCtx,
};

#[derive(Clone, Debug)]
struct BenchArgs {
    backend: Backend,
    filter: Option<String>,
    size: Option<u64>,
    warmup: u32,
    repeats: u32,
    out_dir: PathBuf,
    font: Option<PathBuf>,
    no_snapshots: bool,
    json: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug)]
enum Backend {
    Cpu,
    #[cfg(feature = "gpu")]
    Gpu,
}

impl Backend {
    fn kind(self) -> BackendKind {
        match self {
            Backend::Cpu => BackendKind::Cpu,
            #[cfg(feature = "gpu")]
            Backend::Gpu => BackendKind::Gpu,
        }
    }
}

#[derive(Clone, Debug)]
struct ScenarioMetrics {
    name: String,
    snapshot: String,
    ops: u64,
    complexity: Option<u64>,
    digest: String,
    replays: Vec<Duration>,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> anyhow::Result<()> {
    let args = parse_args()?;

    if args.repeats == 0 {
        anyhow::bail!("--repeats must be >= 1");
    }

    let font = load_font(args.font.as_deref())?;
    if font.is_none() {
        eprintln!("note: no font found; the textblobs scenario will be skipped (pass --font)");
    }

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create out dir '{}'", args.out_dir.display()))?;

    let scenarios: Vec<ScenarioId> = ScenarioId::all()
        .into_iter()
        .filter(|id| match &args.filter {
            Some(f) => id.name().contains(f.as_str()),
            None => true,
        })
        .collect();
    if scenarios.is_empty() {
        anyhow::bail!("no scenario matches the filter");
    }

    eprintln!(
        "bench: {count} scenario(s) ({profile} build), backend={backend:?}, warmup={warmup}, repeats={repeats}",
        count = scenarios.len(),
        profile = if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
        backend = args.backend,
        warmup = args.warmup,
        repeats = args.repeats,
    );

    let mut all = Vec::<ScenarioMetrics>::new();
    for id in scenarios {
        if id == ScenarioId::TextBlobs && font.is_none() {
            eprintln!("skip {name}: no font", name = id.name());
            continue;
        }
        match run_scenario(&args, id, font.clone()) {
            Ok(metrics) => {
                report_scenario(&metrics);
                all.push(metrics);
            }
            Err(e) => eprintln!("fail {name}: {e:#}", name = id.name()),
        }
    }

    if let Some(path) = &args.json {
        write_json_report(path, &args, &all)?;
        eprintln!("report: {}", path.display());
    }
    Ok(())
}

fn run_scenario(
    args: &BenchArgs,
    id: ScenarioId,
    font: Option<FontBytes>,
) -> anyhow::Result<ScenarioMetrics> {
    let settings = RenderSettings {
        clear_rgba: Some([255, 255, 255, 255]),
    };
    let mut provider = create_provider(args.backend.kind(), &settings)?;

    // Recording is deliberately outside the timed region; replay cost is the
    // quantity under measurement.
    let size = args.size.unwrap_or_else(|| id.default_size());
    let workload = {
        let mut ctx = ScenarioCtx {
            provider: provider.as_mut(),
            font,
        };
        id.build(size, &mut ctx)?
    };

    provider.initialize_surface(workload.canvas_width, workload.canvas_height)?;

    for _ in 0..args.warmup {
        workload.list.render_to(provider.surface()?)?;
        provider.flush_and_submit(true)?;
    }

    let mut replays = Vec::with_capacity(args.repeats as usize);
    for _ in 0..args.repeats {
        let t0 = Instant::now();
        workload.list.render_to(provider.surface()?)?;
        provider.flush_and_submit(true)?;
        replays.push(t0.elapsed());
    }

    let frame = provider.surface()?.read_pixels()?;
    let digest = sha256_hex(&frame.data);

    let snapshot = workload.snapshot_name(provider.backend_name());
    if !args.no_snapshots {
        provider.snapshot(&args.out_dir.join(&snapshot))?;
    }

    Ok(ScenarioMetrics {
        name: id.name(),
        snapshot,
        ops: workload.list.len() as u64,
        complexity: workload.complexity,
        digest,
        replays,
    })
}

fn report_scenario(m: &ScenarioMetrics) {
    let mut sorted = m.replays.clone();
    sorted.sort_by_key(|d| d.as_nanos());
    eprintln!(
        "{name:32} ops={ops:<6} n={n:<5} p50={p50} p90={p90} p99={p99} digest={digest}",
        name = m.name,
        ops = m.ops,
        n = m
            .complexity
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string()),
        p50 = fmt_ms(percentile(&sorted, 0.50)),
        p90 = fmt_ms(percentile(&sorted, 0.90)),
        p99 = fmt_ms(percentile(&sorted, 0.99)),
        digest = &m.digest[..16],
    );
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let n = sorted.len();
    let rank = (p * (n as f64)).ceil().clamp(1.0, n as f64) as usize;
    sorted[rank - 1]
}

fn fmt_ms(d: Duration) -> String {
    format!("{:>9.3}ms", d.as_secs_f64() * 1000.0)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn write_json_report(
    path: &Path,
    args: &BenchArgs,
    metrics: &[ScenarioMetrics],
) -> anyhow::Result<()> {
    let scenarios: Vec<serde_json::Value> = metrics
        .iter()
        .map(|m| {
            let mut sorted = m.replays.clone();
            sorted.sort_by_key(|d| d.as_nanos());
            json!({
                "name": m.name,
                "snapshot": m.snapshot,
                "ops": m.ops,
                "complexity": m.complexity,
                "digest": m.digest,
                "p50_ms": percentile(&sorted, 0.50).as_secs_f64() * 1000.0,
                "p90_ms": percentile(&sorted, 0.90).as_secs_f64() * 1000.0,
                "p99_ms": percentile(&sorted, 0.99).as_secs_f64() * 1000.0,
            })
        })
        .collect();

    let report = json!({
        "backend": format!("{:?}", args.backend),
        "warmup": args.warmup,
        "repeats": args.repeats,
        "scenarios": scenarios,
    });
    std::fs::write(path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("write report '{}'", path.display()))?;
    Ok(())
}

fn load_font(explicit: Option<&Path>) -> anyhow::Result<Option<FontBytes>> {
    if let Some(path) = explicit {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        return Ok(Some(FontBytes::new(bytes)));
    }

    // Common system font locations, best effort only.
    const CANDIDATES: [&str; 4] = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/Library/Fonts/Arial Unicode.ttf",
    ];
    for candidate in CANDIDATES {
        if let Ok(bytes) = std::fs::read(candidate) {
            return Ok(Some(FontBytes::new(bytes)));
        }
    }
    Ok(None)
}

fn parse_args() -> anyhow::Result<BenchArgs> {
    let mut args = std::env::args().skip(1);

    let mut out = BenchArgs {
        backend: Backend::Cpu,
        filter: None,
        size: None,
        warmup: 1,
        repeats: 50,
        out_dir: PathBuf::from("bench-out"),
        font: None,
        no_snapshots: false,
        json: None,
    };

    while let Some(a) = args.next() {
        match a.as_str() {
            "--backend" => {
                let v = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("missing value for --backend"))?;
                out.backend = match v.as_str() {
                    "cpu" => Backend::Cpu,
                    #[cfg(feature = "gpu")]
                    "gpu" => Backend::Gpu,
                    _ => anyhow::bail!("unknown --backend '{v}'"),
                };
            }
            "--scenario" => {
                out.filter = Some(
                    args.next()
                        .ok_or_else(|| anyhow::anyhow!("missing value for --scenario"))?,
                );
            }
            "--size" => out.size = Some(parse_u64(args.next(), "--size")?),
            "--warmup" => out.warmup = parse_u32(args.next(), "--warmup")?,
            "--repeats" => out.repeats = parse_u32(args.next(), "--repeats")?,
            "--out-dir" => {
                out.out_dir = PathBuf::from(
                    args.next()
                        .ok_or_else(|| anyhow::anyhow!("missing value for --out-dir"))?,
                );
            }
            "--font" => {
                out.font = Some(PathBuf::from(
                    args.next()
                        .ok_or_else(|| anyhow::anyhow!("missing value for --font"))?,
                ));
            }
            "--no-snapshots" => out.no_snapshots = true,
            "--json" => {
                out.json = Some(PathBuf::from(
                    args.next()
                        .ok_or_else(|| anyhow::anyhow!("missing value for --json"))?,
                ));
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => anyhow::bail!("unknown arg '{a}' (try --help)"),
        }
    }

    Ok(out)
}

fn print_help() {
    eprintln!(
        r#"encore-bench

Records each scenario's display list once, then times replay + synchronous
submit for the requested number of repeats. Reports p50/p90/p99 per scenario
plus a sha-256 digest of the final frame for cross-run and cross-backend
comparison.

Usage:
  cargo run -q --release
  cargo run -q --release -- --scenario rects --repeats 200
  cargo run -q --release -- --backend cpu --json bench-out/report.json

Args:
  --backend cpu|gpu   (default cpu; gpu requires the 'gpu' feature)
  --scenario SUBSTR   run only scenarios whose name contains SUBSTR
  --size N            override every scenario's size parameter
  --warmup N          (default 1)
  --repeats N         (default 50)
  --out-dir PATH      (default bench-out)
  --font PATH         font file for textblobs (.ttf/.otf)
  --no-snapshots      skip writing snapshot PNGs
  --json PATH         also write a machine-readable report
"#
    );
}

fn parse_u32(v: Option<String>, flag: &str) -> anyhow::Result<u32> {
    let v = v.ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))?;
    v.parse::<u32>()
        .with_context(|| format!("parse {flag} value '{v}'"))
}

fn parse_u64(v: Option<String>, flag: &str) -> anyhow::Result<u64> {
    let v = v.ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))?;
    v.parse::<u64>()
        .with_context(|| format!("parse {flag} value '{v}'"))
}
