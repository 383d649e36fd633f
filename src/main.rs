mod binary_utils;
mod formats;
mod portrait_extractor;
mod stage_extractor;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use portrait_extractor::PortraitExtractor;
use stage_extractor::StageExtractor;

#[derive(Parser)]
#[command(
    name = "sff_extractor",
    about = "Portrait and stage preview extraction for SFF sprite archives"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract the character select portrait as a PNG
    Portrait {
        archive: PathBuf,
        output: PathBuf,
    },
    /// Extract the stage preview thumbnail as a PNG
    Stage {
        archive: PathBuf,
        output: PathBuf,
    },
    /// Extract one sprite by its group and image number
    Sprite {
        archive: PathBuf,
        output: PathBuf,
        #[arg(long)]
        group: u16,
        #[arg(long)]
        image: u16,
    },
    /// List the sprites in an archive, optionally as a JSON manifest
    List {
        archive: PathBuf,
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Build a stage archive from a background image
    WriteStage {
        input: PathBuf,
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Portrait { archive, output } => PortraitExtractor::new(&archive)
            .and_then(|extractor| extractor.extract_portrait(&output)),
        Command::Stage { archive, output } => {
            StageExtractor::new(&archive).and_then(|extractor| extractor.extract_preview(&output))
        }
        Command::Sprite {
            archive,
            output,
            group,
            image,
        } => PortraitExtractor::new(&archive)
            .and_then(|extractor| extractor.extract_sprite(group, image, &output)),
        Command::List { archive, manifest } => {
            PortraitExtractor::new(&archive).and_then(|extractor| match manifest {
                Some(path) => extractor.write_manifest(&path),
                None => {
                    for sprite in extractor.sprites()? {
                        let linked = if sprite.linked { " (linked)" } else { "" };
                        println!(
                            "{:5},{:<5} {}x{} {}{}",
                            sprite.group,
                            sprite.image,
                            sprite.width,
                            sprite.height,
                            sprite.format,
                            linked
                        );
                    }
                    Ok(())
                }
            })
        }
        Command::WriteStage { input, output } => {
            stage_extractor::write_stage_background(&input, &output)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
