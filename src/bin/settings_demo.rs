use sessiongate::settings::*;

// $ cargo run --bin settings_demo -- --settings=settings/dev.toml
// $ SESSIONGATE__AUTH__BACKEND=real cargo run --bin settings_demo
fn main() -> anyhow::Result<()> {
    let project_settings = parse_settings(None)?;
    println!("Loaded default settings: {:?}", project_settings);

    let is_err = parse_settings(Some("")).is_err();
    println!("Error on invalid path: {:?}", is_err);

    let cli = Cli::parse();
    let project_settings = parse_settings(cli.settings.as_deref())?;
    println!("Loaded settings: {:?}", project_settings);

    Ok(())
}
