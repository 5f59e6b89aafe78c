use std::path::PathBuf;

use argh::FromArgs;

use lidarkit::analysis::statistics::{analyze_cloud, AnalysisParams, PointCloudStatistics};
use lidarkit::analysis::summary::analysis_prompt;
use lidarkit::k3d::capture::{DepthFrameSource, RawDepthFileSource};
use lidarkit::k3d::io::ply::{exporter_for_path, read_ply, PlyExporter, PlyFormat, PointCloudExporter};
use lidarkit::k3d::pointcloud::PointCloud;
use lidarkit::storage::{FilePointCloudStorage, PointCloudStorage};

#[derive(FromArgs, Debug)]
/// Reconstruct, analyze and store depth sensor point clouds.
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum Command {
    Reconstruct(ReconstructArgs),
    Analyze(AnalyzeArgs),
    List(ListArgs),
    Delete(DeleteArgs),
}

#[derive(FromArgs, Debug)]
/// Turn a raw depth dump into a point cloud.
#[argh(subcommand, name = "reconstruct")]
struct ReconstructArgs {
    /// raw little endian f32 depth file
    #[argh(option)]
    depth: PathBuf,

    /// frame width in pixels
    #[argh(option)]
    width: usize,

    /// frame height in pixels
    #[argh(option)]
    height: usize,

    /// raw u8 confidence file
    #[argh(option)]
    confidence: Option<PathBuf>,

    /// sensor timestamp recorded as the frame number
    #[argh(option, default = "0.0")]
    frame_timestamp: f64,

    /// write the cloud to this .ply file
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// write ASCII instead of binary PLY
    #[argh(switch)]
    ascii: bool,

    /// store directory to save the cloud into
    #[argh(option)]
    store: Option<PathBuf>,

    /// identifier to save the cloud under
    #[argh(option)]
    id: Option<String>,
}

#[derive(FromArgs, Debug)]
/// Print statistics of a point cloud.
#[argh(subcommand, name = "analyze")]
struct AnalyzeArgs {
    /// PLY file to analyze
    #[argh(option, short = 'i')]
    input: Option<PathBuf>,

    /// store directory to load the cloud from
    #[argh(option)]
    store: Option<PathBuf>,

    /// identifier of the stored cloud
    #[argh(option)]
    id: Option<String>,

    /// seed for plane detection
    #[argh(option)]
    seed: Option<u64>,

    /// print the statistics as JSON
    #[argh(switch)]
    json: bool,

    /// print the narrative summary request
    #[argh(switch)]
    prompt: bool,
}

#[derive(FromArgs, Debug)]
/// List stored point clouds.
#[argh(subcommand, name = "list")]
struct ListArgs {
    /// store directory
    #[argh(option)]
    store: PathBuf,
}

#[derive(FromArgs, Debug)]
/// Delete a stored point cloud.
#[argh(subcommand, name = "delete")]
struct DeleteArgs {
    /// store directory
    #[argh(option)]
    store: PathBuf,

    /// identifier of the stored cloud
    #[argh(option)]
    id: String,
}

async fn reconstruct(args: ReconstructArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut source = RawDepthFileSource::new(&args.depth, args.width, args.height)
        .with_frame_timestamp(args.frame_timestamp);
    if let Some(confidence) = &args.confidence {
        source = source.with_confidence(confidence);
    }

    let Some(frame) = source.next_frame()? else {
        return Err("the depth source produced no frame".into());
    };
    let cloud = frame.into_pointcloud();
    println!("Reconstructed {} points", cloud.len());

    if let Some(output) = &args.output {
        let exporter = exporter_for_path(output)?;
        if args.ascii {
            PlyExporter::new(PlyFormat::Ascii).write(&cloud, output)?;
        } else {
            exporter.write(&cloud, output)?;
        }
        println!("Wrote {}", output.display());
    }

    match (&args.store, &args.id) {
        (Some(store), Some(id)) => {
            FilePointCloudStorage::new(store).save(&cloud, id).await?;
            println!("Saved as {id} in {}", store.display());
        }
        (None, None) => {}
        _ => return Err("--store and --id must be given together".into()),
    }

    Ok(())
}

async fn load_input(args: &AnalyzeArgs) -> Result<PointCloud, Box<dyn std::error::Error>> {
    match (&args.input, &args.store, &args.id) {
        (Some(input), None, None) => Ok(read_ply(input)?),
        (None, Some(store), Some(id)) => Ok(FilePointCloudStorage::new(store).load(id).await?),
        _ => Err("expected either --input or both --store and --id".into()),
    }
}

fn print_statistics(stats: &PointCloudStatistics) {
    let heights = &stats.height_distribution;
    let planes = &stats.plane_summary;
    println!("points:            {}", stats.point_count);
    println!(
        "dimensions:        {:.2} x {:.2} x {:.2} m",
        stats.dimensions.x, stats.dimensions.y, stats.dimensions.z
    );
    println!("density:           {:.2} points/m3", stats.density);
    println!("confidence:        {:.2}", stats.average_confidence);
    println!("normals:           {:.1}%", stats.normal_percentage);
    println!(
        "heights:           floor {:.2} / median {:.2} / ceiling {:.2} m",
        heights.floor_height, heights.median_height, heights.ceiling_height
    );
    println!(
        "planes:            {} vertical, {} horizontal",
        planes.vertical_planes.len(),
        planes.horizontal_planes.len()
    );
    println!(
        "regions:           {} dense, {} sparse, {:.2} points/cell",
        stats.spatial_density.dense_regions.len(),
        stats.spatial_density.sparse_regions.len(),
        stats.spatial_density.average_local_density
    );
}

async fn analyze(args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cloud = load_input(&args).await?;
    let params = AnalysisParams {
        random_seed: args.seed,
        ..Default::default()
    };
    let stats = analyze_cloud(&cloud, &params);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_statistics(&stats);
    }

    if args.prompt {
        println!("{}", analysis_prompt(&stats));
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Args = argh::from_env();
    log::debug!("{args:?}");

    match args.command {
        Command::Reconstruct(args) => reconstruct(args).await?,
        Command::Analyze(args) => analyze(args).await?,
        Command::List(args) => {
            for id in FilePointCloudStorage::new(args.store).list().await? {
                println!("{id}");
            }
        }
        Command::Delete(args) => {
            FilePointCloudStorage::new(&args.store).delete(&args.id).await?;
            println!("Deleted {}", args.id);
        }
    }

    Ok(())
}
