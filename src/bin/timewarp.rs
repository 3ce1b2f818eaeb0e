use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use timewarp::{
    DestImage, DistortionMesh, FramePoses, FrameStats, HmdInfo, Sampling, SourceImage, StaticView,
    TestImage, TimewarpConfig, TimewarpFrame, ViewPredictor as _,
};

#[derive(Parser, Debug)]
#[command(name = "timewarp", version)]
struct Cli {
    /// Log per-worker placement and per-frame tile counts.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Time every sampler on the default headset and write a TGA of each result.
    Bench(BenchArgs),
    /// Warp a single frame with one sampler and write it as a TGA.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Headset description JSON (defaults to the built-in 1920x1080 model).
    #[arg(long)]
    hmd: Option<PathBuf>,

    /// Worker pool config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker thread count (overrides the config file).
    #[arg(long)]
    workers: Option<usize>,

    /// Width and height of the synthetic source image.
    #[arg(long, default_value_t = 1024)]
    source_size: u32,
}

#[derive(Parser, Debug)]
struct BenchArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Frames per sampler; the best wall time is reported.
    #[arg(long, default_value_t = 25)]
    iterations: u32,

    /// Directory for the per-sampler TGA files.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long, value_enum, default_value_t = Sampling::BilinearPacked)]
    sampling: Sampling,

    /// Head yaw since the eye buffer was rendered, degrees.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    yaw_deg: f32,

    /// Output TGA path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let result = match cli.cmd {
        Command::Bench(args) => cmd_bench(args),
        Command::Frame(args) => cmd_frame(args),
    };
    timewarp::shutdown()?;
    result
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parse {what} JSON"))
}

/// Everything a run needs besides the sampler and the pose.
struct Setup {
    hmd: HmdInfo,
    mesh: DistortionMesh,
    image: TestImage,
    dest: Vec<u8>,
}

impl Setup {
    fn new(args: &CommonArgs) -> anyhow::Result<Self> {
        let hmd = match &args.hmd {
            Some(path) => read_json(path, "hmd")?,
            None => HmdInfo::default(),
        };
        let mut config = match &args.config {
            Some(path) => TimewarpConfig::from_json_file(path)?,
            None => TimewarpConfig::default(),
        };
        if args.workers.is_some() {
            config.workers = args.workers;
        }
        timewarp::init(&config).context("start worker pool")?;

        let mesh = timewarp::build_distortion_mesh(&hmd)?;
        let tiles = mesh.tiles();
        let image = TestImage::blocks(args.source_size, args.source_size);
        let dest = vec![0u8; tiles.frame_width() * tiles.eye_height() * timewarp::BYTES_PER_PIXEL];
        Ok(Self {
            hmd,
            mesh,
            image,
            dest,
        })
    }

    fn warp(&mut self, sampling: Sampling, poses: FramePoses) -> anyhow::Result<FrameStats> {
        let source = if sampling.is_planar() {
            SourceImage::Planar(self.image.planar()?)
        } else {
            SourceImage::Packed(self.image.packed()?)
        };
        let tiles = self.mesh.tiles();
        let mut dest = DestImage::new(&mut self.dest, tiles, tiles.frame_width() as u32)?;
        let frame = TimewarpFrame::new(source, &self.mesh, sampling).with_poses(poses);
        Ok(timewarp::timewarp(&frame, &mut dest)?)
    }

    fn save_tga(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        let tiles = self.mesh.tiles();
        image::save_buffer_with_format(
            path,
            &self.dest,
            tiles.frame_width() as u32,
            tiles.eye_height() as u32,
            image::ColorType::Rgba8,
            image::ImageFormat::Tga,
        )
        .with_context(|| format!("write tga '{}'", path.display()))
    }

    fn poses(&self, yaw_deg: f32) -> FramePoses {
        let view = StaticView::from_euler_degrees(yaw_deg, 0.0, 0.0).view_at(0.0);
        FramePoses {
            projection: self.hmd.projection(),
            start_view: view,
            end_view: view,
            ..FramePoses::default()
        }
    }
}

fn cmd_bench(args: BenchArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.iterations > 0, "--iterations must be >= 1");
    let mut setup = Setup::new(&args.common)?;
    let poses = setup.poses(0.0);
    let tiles = setup.mesh.tiles();
    let pixels = (tiles.frame_width() * tiles.eye_height()) as f64;

    for sampling in Sampling::ALL {
        let mut best = Duration::MAX;
        let mut stats = FrameStats::default();
        for _ in 0..args.iterations {
            let start = Instant::now();
            stats = setup.warp(sampling, poses)?;
            best = best.min(start.elapsed());
        }
        let mpix = pixels / best.as_secs_f64() / 1e6;
        println!(
            "{:<18} best {:>8.3} ms  {:>9.1} Mpixels/s  ({} sampled, {} cleared)",
            sampling.name(),
            best.as_secs_f64() * 1e3,
            mpix,
            stats.tiles_sampled,
            stats.tiles_cleared
        );
        let out = args.out_dir.join(format!("timewarp-{}.tga", sampling.name()));
        setup.save_tga(&out)?;
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut setup = Setup::new(&args.common)?;
    let poses = setup.poses(args.yaw_deg);
    let stats = setup.warp(args.sampling, poses)?;
    setup.save_tga(&args.out)?;
    eprintln!(
        "wrote {} ({} tiles sampled, {} cleared)",
        args.out.display(),
        stats.tiles_sampled,
        stats.tiles_cleared
    );
    Ok(())
}
