// Photo export: PNG bytes and a timestamped file in the chosen directory.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use log::info;

use crate::error::Result;

/// Encode the flattened photo as PNG.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// `dir` if given, else the user's pictures directory, else the working directory.
pub fn output_dir(dir: Option<&Path>) -> PathBuf {
    dir.map(Path::to_path_buf)
        .or_else(dirs::picture_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `fotofilter_<local timestamp>`, without extension.
pub fn photo_stem() -> String {
    chrono::Local::now()
        .format("fotofilter_%Y-%m-%d_%H-%M-%S")
        .to_string()
}

/// First free `<stem>.png`, `<stem>_1.png`, `<stem>_2.png`, ... in `dir`.
fn free_path(dir: &Path, stem: &str) -> PathBuf {
    let mut path = dir.join(format!("{stem}.png"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{stem}_{n}.png"));
        n += 1;
    }
    path
}

/// Write the photo into `dir` under a fresh timestamped name. Returns the file path.
pub fn save_png(img: &RgbaImage, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = free_path(dir, &photo_stem());
    std::fs::write(&path, encode_png(img)?)?;
    info!("saved {}", path.display());
    Ok(path)
}
