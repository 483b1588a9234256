#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(feature = "strict", deny(warnings))]

use bpal::{dump_listing, read_listing, transcode_file, Config, Error};
use clap::Parser;
use std::{fs, fs::File, io, path::PathBuf, process};
use tracing::Level;

/// Adds a BPal palette-substitution table to a Blorb file.
#[derive(Parser)]
#[clap(version)]
struct Args {
    input: PathBuf,
    /// Story file to embed as the executable chunk
    exec: Option<PathBuf>,
    #[clap(short, long, default_value = "out.blb")]
    output: PathBuf,
    #[clap(short, long = "config")]
    config_path: Option<PathBuf>,
    /// Store generated images without running the optimiser
    #[clap(long)]
    no_recompress: bool,
    /// Print the chunks and index of INPUT instead of transcoding it
    #[clap(long)]
    dump: bool,
    #[clap(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .init();

    if let Err(e) = args.run() {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

impl Args {
    fn run(self) -> Result<(), Error> {
        if self.dump {
            let listing = read_listing(&mut File::open(&self.input)?)?;
            let mut dump = String::with_capacity(1 << 12);
            dump_listing(&mut dump, &listing).map_err(io::Error::other)?;
            print!("{dump}");
            return Ok(());
        }

        let mut config = match self.config_path {
            Some(path) => Config::from_ini(&fs::read_to_string(&path)?)?,
            None => Config::default(),
        };
        if self.no_recompress {
            config.recompress = false;
        }

        let exec = self.exec.as_deref();
        if config.recompress {
            let recompressor = config.recompressor;
            transcode_file(&self.input, exec, &self.output, |data| {
                Ok(recompressor.run(data)?)
            })
        } else {
            transcode_file(&self.input, exec, &self.output, |data| Ok(data.to_vec()))
        }
    }
}
