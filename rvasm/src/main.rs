#[macro_use]
extern crate clap;

use anyhow::Context;
use byteorder::WriteBytesExt;
use clap::Arg;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use util::Endian;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the input file to use")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Sets the output file to write to"),
        )
        .arg(
            Arg::with_name("source_map")
                .short("m")
                .long("source_map")
                .takes_value(true)
                .value_name("SOURCE_MAP")
                .help("Sets the file to write the source map to"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let output = matches.value_of("output");
    let map = matches.value_of("source_map");

    run(input, output, map)
}

fn run(input: &str, output: Option<&str>, map: Option<&str>) -> anyhow::Result<()> {
    let input_path = Path::new(input);

    let input_file = File::open(input_path)
        .with_context(|| format!("reading input file \"{}\"", input_path.display()))?;
    let mut buf_reader = BufReader::new(input_file);
    let mut source = String::new();
    buf_reader
        .read_to_string(&mut source)
        .with_context(|| format!("reading input file \"{}\"", input_path.display()))?;

    let (executable, source_map) = rvasm::assemble(&source).map_err(|diagnostics| {
        let mut message = String::new();
        for d in &diagnostics {
            message.push_str(&d.to_string());
        }
        anyhow::anyhow!("assembly of \"{}\" failed:\n{}", input_path.display(), message)
    })?;

    let output_path: PathBuf =
        output.map(PathBuf::from).unwrap_or_else(|| input_path.with_extension("rvx"));

    rvx::write_file(&output_path, &executable)
        .with_context(|| format!("writing output file \"{}\"", output_path.display()))?;
    log::info!("wrote {}", output_path.display());

    if let Some(map_path_str) = map {
        let map_path = PathBuf::from(map_path_str);
        write_source_map(&source_map[..], &map_path)
            .with_context(|| format!("writing source map \"{}\"", map_path.display()))?;
    }
    Ok(())
}

fn write_source_map(source_map: &[rvasm::SourceMapItem], path: &PathBuf) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in source_map.iter() {
        writer.write_u32::<Endian>(item.start_line)?;
        writer.write_u32::<Endian>(item.line_count)?;
    }
    Ok(())
}
