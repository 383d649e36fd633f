use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::formats::{sff, sff_writer};
use crate::portrait_extractor::save_png;

/// Reads an SFF archive from disk and extracts the stage preview sprite
pub struct StageExtractor {
    archive_path: PathBuf,
    archive_data: Vec<u8>,
}

impl StageExtractor {
    pub fn new<P: AsRef<Path>>(archive_path: P) -> io::Result<Self> {
        let archive_path = archive_path.as_ref().to_path_buf();
        let mut file = File::open(&archive_path)?;
        let mut archive_data = Vec::new();
        file.read_to_end(&mut archive_data)?;

        Ok(StageExtractor {
            archive_path,
            archive_data,
        })
    }

    /// Extract the stage preview thumbnail and save it as a PNG
    pub fn extract_preview(&self, output_path: &Path) -> io::Result<()> {
        let preview = sff::extract_stage_preview(&self.archive_data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        save_png(&preview, output_path)?;

        println!(
            "Extracted {}x{} stage preview from {} to {}",
            preview.width(),
            preview.height(),
            self.archive_path.display(),
            output_path.display()
        );
        Ok(())
    }
}

/// Build a stage archive from a background image file: the full image as
/// sprite 0,0 plus a downscaled preview as sprite 9000,0
pub fn write_stage_background(input_path: &Path, output_path: &Path) -> io::Result<()> {
    let background = image::open(input_path)
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to open {}: {}", input_path.display(), e),
            )
        })?
        .to_rgba8();

    sff_writer::write_stage_background(&background, output_path)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    println!(
        "Wrote stage archive for {}x{} background to {}",
        background.width(),
        background.height(),
        output_path.display()
    );
    Ok(())
}
