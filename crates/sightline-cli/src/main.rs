use serde::Serialize;
use sightline::{
    Boundary, Frame, Point, QualityMetric, RenderError, Search, SearchOptions, SearchSummary,
    TrialStatus, Visualizer,
};
use sightline_render::{SvgRenderOptions, render_frame_svg};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Search(sightline::Error),
    Json(serde_json::Error),
    Raster(&'static str),
    NoResult,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Search(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Raster(msg) => write!(f, "PNG rendering failed: {msg}"),
            CliError::NoResult => write!(f, "No trial produced a usable configuration"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<sightline::Error> for CliError {
    fn from(value: sightline::Error) -> Self {
        Self::Search(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum Mode {
    #[default]
    Constructive,
    Relax,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum RenderFormat {
    #[default]
    Svg,
    Png,
}

impl FromStr for RenderFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    mode: Mode,
    positional: Vec<String>,
    seed: Option<u64>,
    trials: Option<usize>,
    steps: Option<usize>,
    time_limit: Option<Duration>,
    out: Option<String>,
    render_format: Option<RenderFormat>,
    render_scale: f32,
    frames: Option<PathBuf>,
    json: bool,
    pretty: bool,
    quiet: bool,
}

fn usage() -> &'static str {
    "sightline-cli\n\
\n\
USAGE:\n\
  sightline-cli [constructive] [<num_points> [<num_trials>]] [OPTIONS]\n\
  sightline-cli relax [<num_points> [<repulse> <repulse_distance>]] [OPTIONS]\n\
\n\
OPTIONS:\n\
  --seed <n>             RNG seed (default 0)\n\
  --trials <n>           number of trials (overrides the positional value)\n\
  --steps <n>            relaxation steps per trial; its square caps layout retries\n\
  --time-limit <secs>    stop starting new work after this many seconds\n\
  --out <path>           write the best configuration as SVG or PNG\n\
  --format svg|png       output format for --out (default: from the extension, else svg)\n\
  --scale <n>            PNG pixels per arena unit (default 0.25)\n\
  --frames <dir>         write every improving configuration as SVG into <dir>\n\
  --json                 print the run summary as JSON\n\
  --pretty               pretty-print JSON\n\
  --quiet                no progress on stderr\n\
\n\
NOTES:\n\
  - constructive defaults: 20 points, 200 trials.\n\
  - relax defaults: 4 points, repulse 50, repulse distance 2.1, 100 trials.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        render_scale: 0.25,
        ..Default::default()
    };

    let mut it = argv.iter().skip(1);
    let mut first = true;
    while let Some(a) = it.next() {
        let is_first = std::mem::replace(&mut first, false);
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "constructive" if is_first => args.mode = Mode::Constructive,
            "relax" if is_first => args.mode = Mode::Relax,
            "--json" => args.json = true,
            "--pretty" => args.pretty = true,
            "--quiet" | "-q" => args.quiet = true,
            "--seed" => args.seed = Some(parse_value(it.next())?),
            "--trials" => args.trials = Some(parse_value(it.next())?),
            "--steps" => args.steps = Some(parse_value(it.next())?),
            "--time-limit" => {
                let secs: f64 = parse_value(it.next())?;
                if !(secs.is_finite() && secs >= 0.0) {
                    return Err(CliError::Usage(usage()));
                }
                args.time_limit = Some(Duration::from_secs_f64(secs));
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.render_format = Some(
                    fmt.parse::<RenderFormat>()
                        .map_err(|_| CliError::Usage(usage()))?,
                );
            }
            "--scale" => {
                args.render_scale = parse_value(it.next())?;
                if !(args.render_scale.is_finite() && args.render_scale > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
            }
            "--frames" => {
                let Some(dir) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.frames = Some(PathBuf::from(dir));
            }
            other if other.starts_with("--") => return Err(CliError::Usage(usage())),
            value => args.positional.push(value.to_string()),
        }
    }

    let max_positional = match args.mode {
        Mode::Constructive => 2,
        Mode::Relax => 3,
    };
    if args.positional.len() > max_positional {
        return Err(CliError::Usage(usage()));
    }
    // Repulsion strength and distance come as a pair.
    if args.mode == Mode::Relax && args.positional.len() == 2 {
        return Err(CliError::Usage(usage()));
    }

    Ok(args)
}

fn parse_value<T: FromStr>(raw: Option<&String>) -> Result<T, CliError> {
    raw.and_then(|s| s.trim().parse::<T>().ok())
        .ok_or(CliError::Usage(usage()))
}

fn positional<T: FromStr>(args: &Args, index: usize, default: T) -> Result<T, CliError> {
    match args.positional.get(index) {
        Some(raw) => parse_value(Some(raw)),
        None => Ok(default),
    }
}

fn build_options(args: &Args) -> Result<SearchOptions, CliError> {
    let mut options = match args.mode {
        Mode::Constructive => {
            let num_points = positional(args, 0, 20usize)?;
            let num_trials = positional(args, 1, 200usize)?;
            SearchOptions::constructive(num_points, num_trials)
        }
        Mode::Relax => {
            let num_points = positional(args, 0, 4usize)?;
            let repulse = positional(args, 1, 50.0f64)?;
            let repulse_distance = positional(args, 2, 2.1f64)?;
            SearchOptions::relaxation(num_points, repulse, repulse_distance)
        }
    };
    if let Some(seed) = args.seed {
        options = options.with_seed(seed);
    }
    if let Some(trials) = args.trials {
        options = options.with_trials(trials);
    }
    if let Some(steps) = args.steps {
        options = options.with_steps(steps);
    }
    if let Some(limit) = args.time_limit {
        options = options.with_time_limit(limit);
    }
    Ok(options)
}

/// Owned copy of a [`Frame`] that can cross to the writer thread.
#[derive(Debug, Clone)]
struct FrameJob {
    points: Vec<Point>,
    radius: f64,
    extent: f64,
    boundary: Boundary,
    num_points: usize,
    layers: Option<usize>,
    trial: usize,
    metric: QualityMetric,
    quality: f64,
    mean_focus_distance: Option<f64>,
    status: TrialStatus,
    is_final: bool,
}

impl FrameJob {
    fn from_frame(frame: &Frame<'_>) -> Self {
        Self {
            points: frame.points.to_vec(),
            radius: frame.radius,
            extent: frame.extent,
            boundary: frame.boundary,
            num_points: frame.num_points,
            layers: frame.layers,
            trial: frame.trial,
            metric: frame.metric,
            quality: frame.quality,
            mean_focus_distance: frame.mean_focus_distance,
            status: frame.status,
            is_final: frame.is_final,
        }
    }

    fn frame(&self) -> Frame<'_> {
        Frame {
            points: &self.points,
            radius: self.radius,
            extent: self.extent,
            boundary: self.boundary,
            num_points: self.num_points,
            layers: self.layers,
            trial: self.trial,
            metric: self.metric,
            quality: self.quality,
            mean_focus_distance: self.mean_focus_distance,
            status: self.status,
            is_final: self.is_final,
        }
    }
}

/// Writes every received frame as `frame-NNNN.svg` and returns how many were written.
fn spawn_frame_writer(
    dir: PathBuf,
    rx: mpsc::Receiver<FrameJob>,
) -> JoinHandle<Result<usize, CliError>> {
    std::thread::spawn(move || {
        std::fs::create_dir_all(&dir)?;
        let options = SvgRenderOptions::default();
        let mut written = 0usize;
        for job in rx {
            let svg = render_frame_svg(&job.frame(), &options);
            let name = if job.is_final {
                "final.svg".to_string()
            } else {
                format!("frame-{written:04}.svg")
            };
            std::fs::write(dir.join(name), svg)?;
            written += 1;
        }
        Ok(written)
    })
}

/// Reports improvements on stderr and forwards them to the frame writer, if any.
struct CliVisualizer {
    quiet: bool,
    frames: Option<mpsc::Sender<FrameJob>>,
}

impl Visualizer for CliVisualizer {
    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        if !self.quiet && !frame.is_final {
            eprintln!(
                "trial {}: best power = {:.6}{}",
                frame.trial,
                frame.quality,
                if frame.status.is_valid() {
                    ""
                } else {
                    " (degraded)"
                }
            );
        }
        if let Some(tx) = &self.frames {
            tx.send(FrameJob::from_frame(frame))
                .map_err(|_| "frame writer stopped")?;
        }
        Ok(())
    }
}

fn resolve_format(args: &Args, out: &Path) -> RenderFormat {
    args.render_format.unwrap_or_else(|| {
        match out.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("png") => RenderFormat::Png,
            _ => RenderFormat::Svg,
        }
    })
}

fn render_svg_to_png(svg: &str, scale: f32) -> Result<Vec<u8>, CliError> {
    let opt = usvg::Options::default();
    let tree = usvg::Tree::from_str(svg, &opt).map_err(|_| CliError::Raster("invalid SVG"))?;
    let size = tree.size();
    let width_px = (size.width() * scale).ceil().max(1.0) as u32;
    let height_px = (size.height() * scale).ceil().max(1.0) as u32;
    let mut pixmap = tiny_skia::Pixmap::new(width_px, height_px)
        .ok_or(CliError::Raster("failed to allocate pixmap"))?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    pixmap
        .encode_png()
        .map_err(|_| CliError::Raster("failed to encode PNG"))
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

#[derive(Serialize)]
struct RunOut<'a> {
    options: &'a SearchOptions,
    summary: &'a SearchSummary,
}

fn print_summary(summary: &SearchSummary) -> Result<(), CliError> {
    let best = summary.best.as_ref().ok_or(CliError::NoResult)?;
    println!(
        "best power = {} (trial {}, {} of {} trials degraded)",
        best.quality, best.index, summary.degraded_trials, summary.trials_run
    );
    if let Some(d) = best.mean_focus_distance {
        println!("mean focus distance = {d:.3} radii");
    }
    for p in &best.configuration {
        println!("{} {} -> {} {}", p.x, p.y, p.focus_x, p.focus_y);
    }
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    let options = build_options(&args)?;
    let search = Search::new(options)?;

    let (sender, writer) = match &args.frames {
        Some(dir) => {
            let (tx, rx) = mpsc::channel();
            (Some(tx), Some(spawn_frame_writer(dir.clone(), rx)))
        }
        None => (None, None),
    };
    let mut visualizer = CliVisualizer {
        quiet: args.quiet,
        frames: sender,
    };
    let summary = search.run(&mut visualizer)?;
    drop(visualizer);

    if let Some(writer) = writer {
        let written = writer
            .join()
            .map_err(|_| CliError::Raster("frame writer panicked"))??;
        if !args.quiet {
            eprintln!("wrote {written} frame(s)");
        }
    }
    if summary.interrupted && !args.quiet {
        eprintln!(
            "stopped early after {} of {} trials",
            summary.trials_run,
            search.options().num_trials
        );
    }

    if let Some(out) = args.out.as_deref() {
        let best = summary.best.as_ref().ok_or(CliError::NoResult)?;
        let svg = render_frame_svg(&search.frame(best, true), &SvgRenderOptions::default());
        let path = Path::new(out);
        match resolve_format(&args, path) {
            RenderFormat::Svg => std::fs::write(path, svg)?,
            RenderFormat::Png => std::fs::write(path, render_svg_to_png(&svg, args.render_scale)?)?,
        }
    }

    if args.json {
        write_json(
            &RunOut {
                options: search.options(),
                summary: &summary,
            },
            args.pretty,
        )
    } else if args.out.is_none() {
        print_summary(&summary)
    } else {
        Ok(())
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(()) => {}
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
