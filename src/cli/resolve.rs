use colored::Colorize;

use crate::error::Result;
use crate::fmt::format_bytes;
use crate::models::{DateKey, FileCategory};
use crate::resolver::{candidate_names, resolve};
use crate::settings::data_dir;

pub fn run(data_dir_override: Option<&str>, date: &str, category: Option<&str>) -> Result<()> {
    let date = DateKey::parse(date)?;
    let categories = match category {
        Some(key) => vec![FileCategory::from_key(key)?],
        None => FileCategory::ALL.to_vec(),
    };
    let folder = date.day_dir(&data_dir(data_dir_override));
    println!("Folder: {}", folder.display());

    for category in categories {
        println!();
        println!("{}", category.label().bold());
        let chosen = resolve(&folder, &date, category)?;
        for name in candidate_names(category, &date) {
            let mark = match &chosen {
                Some(file) if file.file_name() == name => "picked".green().bold(),
                _ if folder.join(&name).is_file() => "present".normal(),
                _ => "missing".dimmed(),
            };
            println!("  {name}  {mark}");
        }
        match chosen {
            Some(file) => println!("  -> {} ({})", file.path.display(), format_bytes(file.size_bytes)),
            None => println!("  -> no file"),
        }
    }
    Ok(())
}
