use crate::error::{ConvertError, Result};
use crate::settings::{load_settings, save_settings, settings_file_exists, settings_path, Settings};

pub fn show() -> Result<()> {
    let settings = load_settings();
    let source = if settings_file_exists() {
        settings_path().display().to_string()
    } else {
        "(defaults, no settings file)".to_string()
    };
    let json = serde_json::to_string_pretty(&settings).map_err(|e| ConvertError::Settings(e.to_string()))?;
    println!("Settings:  {source}");
    println!("{json}");
    Ok(())
}

pub fn init(force: bool) -> Result<()> {
    let path = settings_path();
    if settings_file_exists() && !force {
        println!("Settings already exist at {} (use --force to overwrite).", path.display());
        return Ok(());
    }
    save_settings(&Settings::default())?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}
