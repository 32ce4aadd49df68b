use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::path::{Path, PathBuf};

use libwc_display::config::Config;
use libwc_display::demo::generate;
use libwc_display::error::DisplayError;
use libwc_display::event::{AnnotationSpec, ColorChannel, RenderMode};
use libwc_display::geometry::ProfileRegistry;
use libwc_display::hdf_reader::{FileSummary, Hdf5EventFile, DEFAULT_TABLE_NAME};
use libwc_display::hdf_writer::EventWriter;
use libwc_display::loader::load_events;
use libwc_display::projector::project_event;
use libwc_display::render::{ImageFormat, ImageRenderer, Renderer};
use libwc_display::scene::{Scene, ViewState};
use libwc_display::selection::EventSelection;

fn config_path_arg() -> Arg {
    Arg::new("path")
        .short('p')
        .long("path")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Path to the configuration file")
}

fn table_arg() -> Arg {
    Arg::new("tree")
        .short('t')
        .long("tree")
        .help("Name of the event table in the file")
}

fn cli() -> Command {
    Command::new("wc_display_cli")
        .about("Render water Cherenkov detector events to images")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("new")
                .about("Make a template configuration yaml file")
                .arg(config_path_arg()),
        )
        .subcommand(
            Command::new("render")
                .about("Render the selected events of a configuration to images")
                .arg(config_path_arg())
                .arg(
                    Arg::new("experiment")
                        .short('e')
                        .long("experiment")
                        .help("Detector profile name, e.g. SK or WCTE"),
                )
                .arg(
                    Arg::new("file")
                        .short('f')
                        .long("file")
                        .value_parser(value_parser!(PathBuf))
                        .help("HDF5 event file"),
                )
                .arg(
                    Arg::new("display")
                        .short('d')
                        .long("display")
                        .value_parser(value_parser!(EventSelection))
                        .help("Events to render: all, 12, 3:10 or 1|76|356"),
                )
                .arg(table_arg())
                .arg(
                    Arg::new("color")
                        .short('c')
                        .long("color")
                        .value_parser(value_parser!(ColorChannel))
                        .help("Color hits by charge or time"),
                )
                .arg(
                    Arg::new("mode")
                        .short('m')
                        .long("mode")
                        .value_parser(value_parser!(RenderMode))
                        .help("2d (unrolled surface) or 3d"),
                )
                .arg(
                    Arg::new("photon-tracks")
                        .long("photon-tracks")
                        .action(ArgAction::SetTrue)
                        .help("Also draw optical photon tracks in 3d"),
                )
                .arg(
                    Arg::new("save-path")
                        .long("save-path")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory for the images"),
                )
                .arg(
                    Arg::new("save-file")
                        .long("save-file")
                        .help("Image name stem; the event index and extension are appended"),
                )
                .arg(
                    Arg::new("save-type")
                        .long("save-type")
                        .value_parser(value_parser!(ImageFormat))
                        .help("png or svg"),
                )
                .arg(
                    Arg::new("extra-data")
                        .long("extra-data")
                        .num_args(1..)
                        .action(ArgAction::Append)
                        .value_parser(value_parser!(AnnotationSpec))
                        .help("Event scalars to print in the title, as field:unit"),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Summarize an event file")
                .arg(
                    Arg::new("file")
                        .short('f')
                        .long("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("HDF5 event file"),
                )
                .arg(table_arg()),
        )
        .subcommand(
            Command::new("demo")
                .about("Write a file of synthetic Cherenkov ring events")
                .arg(
                    Arg::new("experiment")
                        .short('e')
                        .long("experiment")
                        .default_value("DEMO")
                        .help("Detector profile name"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("HDF5 file to create"),
                )
                .arg(
                    Arg::new("count")
                        .short('n')
                        .long("count")
                        .default_value("10")
                        .value_parser(value_parser!(usize))
                        .help("Number of events"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("0")
                        .value_parser(value_parser!(u64))
                        .help("Random seed"),
                )
                .arg(table_arg()),
        )
}

fn make_template_config(path: &Path) -> Result<(), DisplayError> {
    let mut config = Config::default();
    config.extra_data.push(AnnotationSpec::new("energy", "MeV"));
    config.write_config_file(path)?;
    Ok(())
}

/// Command line flags take precedence over the configuration file
fn apply_overrides(config: &mut Config, matches: &ArgMatches) {
    if let Some(experiment) = matches.get_one::<String>("experiment") {
        config.experiment = experiment.clone();
    }
    if let Some(file) = matches.get_one::<PathBuf>("file") {
        config.data_path = file.clone();
    }
    if let Some(selection) = matches.get_one::<EventSelection>("display") {
        config.display = selection.to_string();
    }
    if let Some(table) = matches.get_one::<String>("tree") {
        config.table = table.clone();
    }
    if let Some(channel) = matches.get_one::<ColorChannel>("color") {
        config.channel = *channel;
    }
    if let Some(mode) = matches.get_one::<RenderMode>("mode") {
        config.mode = *mode;
    }
    if matches.get_flag("photon-tracks") {
        config.show_photon_tracks = true;
    }
    if let Some(directory) = matches.get_one::<PathBuf>("save-path") {
        config.output.directory = directory.clone();
    }
    if let Some(stem) = matches.get_one::<String>("save-file") {
        config.output.file_stem = Some(stem.clone());
    }
    if let Some(format) = matches.get_one::<ImageFormat>("save-type") {
        config.output.format = *format;
    }
    if let Some(specs) = matches.get_many::<AnnotationSpec>("extra-data") {
        config.extra_data = specs.cloned().collect();
    }
}

fn render(config: &Config, pb_manager: &MultiProgress) -> Result<(), DisplayError> {
    let registry = ProfileRegistry::with_overrides(config.profiles_path.as_deref())?;
    let profile = registry.get(&config.experiment)?;
    let file = Hdf5EventFile::open(&config.data_path, &config.table)?;
    let selection = config.selection()?;
    let events = load_events(&file, &selection, &config.extra_data)?;

    let pb = pb_manager.add(ProgressBar::new(events.n_requested() as u64));
    if let Ok(style) =
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} events {elapsed_precise}")
    {
        pb.set_style(style);
    }

    let mut renderer = ImageRenderer::new(
        &config.output.directory,
        &config.file_stem(),
        config.output.format,
        config.output.size(),
    );
    for (position, event) in events.enumerate() {
        let projected = project_event(event?, profile);
        let view = ViewState::new(position, &projected, config.display_options());
        let scene = Scene::build(&projected, profile, &view);
        renderer.render(&scene)?;
        pb.inc(1);
    }
    pb.finish();
    log::info!(
        "Rendered {} events to {}",
        renderer.written().len(),
        config.output.directory.display()
    );
    Ok(())
}

fn info(path: &Path, table: &str) -> Result<(), DisplayError> {
    let file = Hdf5EventFile::open(path, table)?;
    println!("{}", FileSummary::new(&file));
    Ok(())
}

fn demo(
    experiment: &str,
    output: &Path,
    n_events: usize,
    seed: u64,
    table: &str,
) -> Result<(), DisplayError> {
    let registry = ProfileRegistry::new()?;
    let profile = registry.get(experiment)?;
    let source = generate(profile, n_events, seed);
    let mut writer = EventWriter::new(output, table)?;
    writer.append_source(&source);
    writer.close()?;
    Ok(())
}

fn main() {
    // Create a cli
    let matches = cli().get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }

    let result = match matches.subcommand() {
        Some(("new", sub)) => {
            let Some(config_path) = sub.get_one::<PathBuf>("path") else {
                return;
            };
            log::info!(
                "Making a template config at {}...",
                config_path.to_string_lossy()
            );
            make_template_config(config_path)
        }
        Some(("render", sub)) => {
            let Some(config_path) = sub.get_one::<PathBuf>("path") else {
                return;
            };
            // Load our config
            log::info!("Loading config from {}...", config_path.to_string_lossy());
            match Config::read_config_file(config_path) {
                Ok(mut config) => {
                    apply_overrides(&mut config, sub);
                    log::info!("Config successfully loaded.");
                    log::info!("Experiment: {}", config.experiment);
                    log::info!("Data Path: {}", config.data_path.to_string_lossy());
                    log::info!("Table: {}", config.table);
                    log::info!("Events: {}", config.display);
                    log::info!(
                        "Color: {} Mode: {} Photon tracks: {}",
                        config.channel,
                        config.mode,
                        config.show_photon_tracks
                    );
                    log::info!(
                        "Output: {} ({})",
                        config.output.directory.to_string_lossy(),
                        config.output.format.extension()
                    );
                    render(&config, &pb_manager)
                }
                Err(e) => Err(e.into()),
            }
        }
        Some(("info", sub)) => match sub.get_one::<PathBuf>("file") {
            Some(path) => info(
                path,
                sub.get_one::<String>("tree")
                    .map(|t| t.as_str())
                    .unwrap_or(DEFAULT_TABLE_NAME),
            ),
            None => return,
        },
        Some(("demo", sub)) => {
            let experiment = sub
                .get_one::<String>("experiment")
                .map(|e| e.as_str())
                .unwrap_or("DEMO");
            let Some(output) = sub.get_one::<PathBuf>("output") else {
                return;
            };
            let n_events = sub.get_one::<usize>("count").copied().unwrap_or(10);
            let seed = sub.get_one::<u64>("seed").copied().unwrap_or(0);
            let table = sub
                .get_one::<String>("tree")
                .map(|t| t.as_str())
                .unwrap_or(DEFAULT_TABLE_NAME);
            log::info!(
                "Writing {n_events} {experiment} events to {}...",
                output.to_string_lossy()
            );
            demo(experiment, output, n_events, seed, table)
        }
        _ => return,
    };

    match result {
        Ok(()) => log::info!("Done."),
        Err(e) => log::error!("{e}"),
    }
}
