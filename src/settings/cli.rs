use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "sessiongate", about = "Session and token lifecycle service")]
pub struct Cli {
    /// Path to a TOML settings file (extension optional).
    #[arg(long)]
    pub settings: Option<String>,
}
