use std::path::PathBuf;

use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path, shellexpand_path};

pub fn run(data_dir: Option<&str>) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(dir);
    } else {
        let default = &settings.data_dir;
        println!("Export root [{}]: ", default);
        let mut input = String::new();
        std::io::stdin().read_line(&mut input).ok();
        let chosen = input.trim();
        if !chosen.is_empty() {
            settings.data_dir = shellexpand_path(chosen);
        }
    }

    save_settings(&settings)?;

    let root = PathBuf::from(&settings.data_dir);
    if !root.is_dir() {
        println!("Note: {} does not exist yet.", root.display());
    }
    println!("Saved settings to {}", settings_path().display());
    println!("Export root: {}", root.display());
    Ok(())
}
