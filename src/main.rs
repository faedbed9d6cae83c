use std::{
    path::{Path, PathBuf},
    process::exit,
};

use anyhow::{Context, Result};
use bytepair_visualizer::{
    config::DEFAULT_OUTPUT_DIR,
    reader::read_bytes,
    render::normalized,
    BinaryVisualizer, CooccurrenceTable, VisualizerConfig,
};
use clap::{arg, command, value_parser, ArgMatches};
use log::{error, info, LevelFilter};
use macroquad::{
    prelude::{Color, BLACK},
    shapes::draw_rectangle,
    window::{clear_background, next_frame, Conf},
};

const WINDOW_SIZE: usize = 1024;

fn config(map_size: usize) -> Conf {
    let side = (map_size * scale(map_size)) as i32;
    Conf {
        window_title: "bytepair-visualizer".to_owned(),
        window_width: side,
        window_height: side,
        ..Default::default()
    }
}

fn scale(map_size: usize) -> usize {
    (WINDOW_SIZE / map_size).max(1)
}

fn main() {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .format_timestamp(None)
        .format_target(false)
        .init();
    let map_size = || {
        arg!(--"map-size" <SIZE> "Dimension of the pair matrix and the image")
            .required(false)
            .value_parser(value_parser!(usize))
            .default_value("256")
    };
    let matches = command!()
        .subcommands([
            command!("render").alias("r").args([
                arg!(<FILE> "The input file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
                arg!(<OUTPUT> "The png file to write")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
                map_size(),
            ]),
            command!("convert").alias("c").args([
                arg!(<FILE> "The input file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
                arg!(--"name" <NAME> "Artifact name without extension (default: input file stem)")
                    .required(false),
                arg!(--"output-dir" <DIR> "Directory the artifact is written to")
                    .required(false)
                    .value_parser(value_parser!(PathBuf))
                    .default_value(DEFAULT_OUTPUT_DIR),
                map_size(),
            ]),
            command!("batch").alias("b").args([
                arg!(<DIR> "The directory to render recursively")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
                arg!(<OUTPUT_DIR> "The directory the images are written to")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
                map_size(),
            ]),
            command!("show").alias("s").args([
                arg!(<FILE> "The input file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
                map_size(),
            ]),
        ])
        .subcommand_required(true)
        .get_matches();
    let result = match matches.subcommand() {
        Some(("render", args)) => render(args),
        Some(("convert", args)) => convert(args),
        Some(("batch", args)) => batch(args),
        Some(("show", args)) => show(args),
        _ => unreachable!(),
    };
    if let Err(err) = result {
        error!("{err:#}");
        exit(1);
    }
}

fn visualizer(args: &ArgMatches) -> Result<BinaryVisualizer> {
    let &map_size = args
        .get_one::<usize>("map-size")
        .context("Missing map size")?;
    let mut config = VisualizerConfig::new(map_size);
    if let Some(dir) = args.try_get_one::<PathBuf>("output-dir").ok().flatten() {
        config = config.with_output_dir(dir);
    }
    BinaryVisualizer::new(config).context("Invalid configuration")
}

fn input_file(args: &ArgMatches) -> Result<&PathBuf> {
    let file = args.get_one::<PathBuf>("FILE").context("Missing input file")?;
    if !file.is_file() {
        anyhow::bail!("Input {file:?} does not exist or is not a file");
    }
    Ok(file)
}

fn render(args: &ArgMatches) -> Result<()> {
    let visualizer = visualizer(args)?;
    let file = input_file(args)?;
    let output = args
        .get_one::<PathBuf>("OUTPUT")
        .context("Missing output file")?;
    visualizer
        .render_file(file, output)
        .context("Could not render input file")?;
    info!("Wrote {output:?}");
    Ok(())
}

fn convert(args: &ArgMatches) -> Result<()> {
    let visualizer = visualizer(args)?;
    let file = input_file(args)?;
    let name = match args.get_one::<String>("name") {
        Some(name) => name.clone(),
        None => file_stem(file),
    };
    let path = visualizer
        .generate_visualization(file, &name)
        .context("Could not render input file")?;
    println!("{}", path.display());
    Ok(())
}

fn batch(args: &ArgMatches) -> Result<()> {
    let visualizer = visualizer(args)?;
    let dir = args.get_one::<PathBuf>("DIR").context("Missing directory")?;
    let output = args
        .get_one::<PathBuf>("OUTPUT_DIR")
        .context("Missing output directory")?;
    if !dir.is_dir() {
        anyhow::bail!("{dir:?} does not exist or is not a directory");
    }
    info!("Rendering files below {dir:?}...");
    let written = visualizer
        .render_dir(dir, output)
        .context("Could not render directory")?;
    info!("Wrote {} images to {output:?}", written.len());
    Ok(())
}

fn show(args: &ArgMatches) -> Result<()> {
    let &map_size = args
        .get_one::<usize>("map-size")
        .context("Missing map size")?;
    let file = input_file(args)?;
    let bytes = read_bytes(file).context("Could not read input file")?;
    let mut table = CooccurrenceTable::new(map_size).context("Invalid configuration")?;
    table.parse(&bytes);
    let export = normalized(&table);
    macroquad::Window::from_config(config(map_size), window(export, map_size));
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_owned())
}

async fn window(export: Vec<f32>, map_size: usize) {
    loop {
        draw(&export, map_size);
        next_frame().await
    }
}

fn draw(table: &[f32], map_size: usize) {
    let scale = scale(map_size) as f32;
    clear_background(BLACK);
    for y in 0..map_size {
        for x in 0..map_size {
            let t = table[y * map_size + x];
            if t == 0.0 {
                continue;
            }
            draw_rectangle(
                x as f32 * scale,
                y as f32 * scale,
                scale,
                scale,
                Color::new(t, t, t, 1.0),
            );
        }
    }
}
