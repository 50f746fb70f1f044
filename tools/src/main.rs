use std::fs;
use std::path::{Path, PathBuf};

use character_collision::{CollisionProfile, CollisionState, RaycastController};
use clap::{Parser, Subcommand};
use log::{info, warn};
use physics_rapier::{DebugDrawConfig, DebugLine};
use rapier2d::parry::bounding_volume::Aabb;
use test_map::TestScene;

const EXIT_SUCCESS: i32 = 0;
const EXIT_IO: i32 = 10;
const EXIT_SCENE: i32 = 11;
const EXIT_PROFILE: i32 = 12;

#[derive(Parser)]
#[command(name = "tools", version, about = "2D raycast controller tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a test scene and print every resolved step.
    Simulate(SimulateArgs),
    /// Validate a controller profile TOML.
    CheckProfile {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

#[derive(Parser)]
struct SimulateArgs {
    #[arg(value_name = "SCENE")]
    scene: PathBuf,

    /// Overrides the scene's step count.
    #[arg(long)]
    steps: Option<u32>,

    /// Overrides the scene's profile.
    #[arg(long, value_name = "PATH")]
    profile: Option<PathBuf>,

    /// Print collider and ray debug lines after the last step.
    #[arg(long)]
    draw: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Simulate(args) => run_simulate(args),
        Commands::CheckProfile { path } => run_check_profile(&path),
    };
    std::process::exit(exit_code);
}

fn read_text(path: &Path) -> Result<String, i32> {
    fs::read_to_string(path).map_err(|err| {
        eprintln!("failed to read {}: {}", path.display(), err);
        EXIT_IO
    })
}

fn load_profile(path: &Path) -> Result<CollisionProfile, i32> {
    let text = read_text(path)?;
    CollisionProfile::parse_toml(&text).map_err(|err| {
        eprintln!("{}: {}", path.display(), err);
        EXIT_PROFILE
    })
}

fn run_check_profile(path: &Path) -> i32 {
    match load_profile(path) {
        Ok(profile) => {
            println!(
                "profile ok (rays h={} v={}, skin={}, climb={} deg, descend={} deg)",
                profile.effective_horizontal_ray_count(),
                profile.effective_vertical_ray_count(),
                profile.skin_width,
                profile.max_climb_angle_deg,
                profile.max_descend_angle_deg
            );
            EXIT_SUCCESS
        }
        Err(code) => code,
    }
}

fn run_simulate(args: SimulateArgs) -> i32 {
    let text = match read_text(&args.scene) {
        Ok(text) => text,
        Err(code) => return code,
    };
    let scene = match TestScene::parse_toml(&text) {
        Ok(scene) => scene,
        Err(err) => {
            eprintln!("scene parse failed: {}", err);
            return EXIT_SCENE;
        }
    };
    let validation = scene.validate();
    for warning in &validation.warnings {
        warn!("{}: {}", scene.name, warning);
    }
    let mut world = match scene.build_world() {
        Ok(world) => world,
        Err(err) => {
            eprintln!("scene '{}' invalid: {}", scene.name, err);
            return EXIT_SCENE;
        }
    };

    let mut profile = match &args.profile {
        Some(path) => match load_profile(path) {
            Ok(profile) => profile,
            Err(code) => return code,
        },
        None => scene.profile(),
    };
    profile.record_rays |= args.draw;

    let mut bounds = scene.body_bounds();
    let mut controller = match RaycastController::new(profile, &bounds) {
        Ok(controller) => controller,
        Err(err) => {
            eprintln!("{}", err);
            return EXIT_PROFILE;
        }
    };

    let steps = args.steps.unwrap_or_else(|| scene.steps());
    let desired = scene.displacement();
    info!("simulating '{}' for {} steps", scene.name, steps);
    println!(
        "{:>5} {:>9} {:>9} {:>9} {:>9} {:>7}  flags",
        "step", "dx", "dy", "x", "y", "slope"
    );
    for step in 0..steps {
        let resolved = controller.move_body(&world, &bounds, desired);
        bounds = Aabb::new(bounds.mins + resolved, bounds.maxs + resolved);
        let state = controller.collisions();
        println!(
            "{:>5} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>7.2}  {}",
            step,
            resolved.x,
            resolved.y,
            bounds.mins.x,
            bounds.mins.y,
            state.slope_angle.to_degrees(),
            format_flags(state)
        );
    }

    if args.draw {
        let colliders = world.debug_lines(DebugDrawConfig {
            draw_colliders: true,
            draw_aabbs: false,
        });
        for line in colliders.lines.iter().chain(controller.ray_debug_lines().iter()) {
            print_line(line);
        }
    }
    EXIT_SUCCESS
}

fn format_flags(state: &CollisionState) -> String {
    let mut flags = Vec::new();
    for (set, label) in [
        (state.above, "above"),
        (state.below, "below"),
        (state.left, "left"),
        (state.right, "right"),
        (state.climbing_slope, "climbing"),
        (state.descending_slope, "descending"),
    ] {
        if set {
            flags.push(label);
        }
    }
    if flags.is_empty() {
        "-".to_string()
    } else {
        flags.join(",")
    }
}

fn print_line(line: &DebugLine) {
    println!(
        "line {:.4} {:.4} {:.4} {:.4} rgba({:.1},{:.1},{:.1},{:.1})",
        line.start[0],
        line.start[1],
        line.end[0],
        line.end[1],
        line.color[0],
        line.color[1],
        line.color[2],
        line.color[3]
    );
}
