use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "ocr-translator-rust",
    version,
    about = "Extract text from images and translate Sinhala text to English"
)]
struct Cli {
    /// Image to run through OCR once; prints the JSON response and exits
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// Address to serve on (default: [server].addr from settings)
    #[arg(short = 'a', long = "addr")]
    addr: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Credentials JSON file (api_key or access_token)
    #[arg(short = 'c', long = "credentials")]
    credentials: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    ocr_translator_rust::logging::init(cli.verbose)?;
    let config = ocr_translator_rust::Config {
        data: cli.data,
        addr: cli.addr,
        settings_path: cli.read_settings,
        credentials_path: cli.credentials,
    };

    if config.data.is_some() {
        let output = ocr_translator_rust::run(config).await?;
        println!("{}", output);
        return Ok(());
    }
    ocr_translator_rust::serve(config).await
}
