use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::formats::sff::{self, SpriteInfo};

/// Reads an SFF archive from disk and extracts portrait sprites or a
/// sprite manifest from it
pub struct PortraitExtractor {
    archive_path: PathBuf,
    archive_data: Vec<u8>,
}

impl PortraitExtractor {
    pub fn new<P: AsRef<Path>>(archive_path: P) -> io::Result<Self> {
        let archive_path = archive_path.as_ref().to_path_buf();
        let mut file = File::open(&archive_path)?;
        let mut archive_data = Vec::new();
        file.read_to_end(&mut archive_data)?;

        Ok(PortraitExtractor {
            archive_path,
            archive_data,
        })
    }

    /// Extract the character select portrait and save it as a PNG
    pub fn extract_portrait(&self, output_path: &Path) -> io::Result<()> {
        let portrait = sff::extract_portrait(&self.archive_data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        save_png(&portrait, output_path)?;

        println!(
            "Extracted {}x{} portrait from {} to {}",
            portrait.width(),
            portrait.height(),
            self.archive_path.display(),
            output_path.display()
        );
        Ok(())
    }

    /// Extract one sprite by group and image number and save it as a PNG
    pub fn extract_sprite(&self, group: u16, image: u16, output_path: &Path) -> io::Result<()> {
        let sprite = sff::extract_sprite(&self.archive_data, group, image)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        save_png(&sprite, output_path)?;

        println!(
            "Extracted sprite {},{} to {}",
            group,
            image,
            output_path.display()
        );
        Ok(())
    }

    pub fn sprites(&self) -> io::Result<Vec<SpriteInfo>> {
        sff::list_sprites(&self.archive_data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Write the sprite table as a JSON manifest
    pub fn write_manifest(&self, output_path: &Path) -> io::Result<()> {
        let sprites = self.sprites()?;

        let file = File::create(output_path)?;
        serde_json::to_writer_pretty(file, &sprites)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        println!(
            "Wrote manifest for {} sprites to {}",
            sprites.len(),
            output_path.display()
        );
        Ok(())
    }
}

/// Save a decoded sprite as an optimised PNG. The image is written to a
/// temporary path first so a failed optimisation pass still leaves a
/// valid, merely unoptimised file behind.
pub(crate) fn save_png(image: &RgbaImage, path: &Path) -> io::Result<()> {
    let temp_path = path.with_extension("temp.png");
    image
        .save(&temp_path)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let mut options = oxipng::Options::from_preset(2);
    options.bit_depth_reduction = true;
    options.interlace = None;

    match oxipng::optimize(
        &oxipng::InFile::Path(temp_path.clone()),
        &oxipng::OutFile::Path(Some(path.to_path_buf())),
        &options,
    ) {
        Ok(_) => {
            let _ = fs::remove_file(temp_path);
            Ok(())
        }
        Err(e) => {
            fs::rename(temp_path, path)?;
            eprintln!(
                "Warning: oxipng optimisation failed for {}: {}. File saved unoptimised.",
                path.display(),
                e
            );
            Ok(())
        }
    }
}
