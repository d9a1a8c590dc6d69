use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pagestitch",
    version,
    about = "Full-page web screenshot capture and stitching"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a page to a PNG file
    Capture {
        /// URL to capture
        url: String,
        /// Output file
        #[arg(long, default_value = "screenshot.png")]
        out: String,
        /// Viewport size as WIDTHxHEIGHT
        #[arg(long, default_value = "1280x720")]
        viewport: String,
        /// Upper bound on the per-tile settle wait, in milliseconds
        #[arg(long, default_value_t = 150)]
        settle_ms: u64,
        /// Capture only the visible viewport (no stitching)
        #[arg(long)]
        single: bool,
    },
    /// List projects on a Presentator server
    #[cfg(feature = "upload")]
    Projects {
        #[arg(long)]
        server: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// List prototypes of a Presentator project
    #[cfg(feature = "upload")]
    Prototypes {
        #[arg(long)]
        server: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Project id
        #[arg(long)]
        project: String,
    },
    /// Capture a page and upload it as a screen of a prototype
    #[cfg(feature = "upload")]
    Upload {
        /// URL to capture
        url: String,
        #[arg(long)]
        server: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Prototype id the screen is attached to
        #[arg(long)]
        prototype: String,
        /// Screen title; defaults to a timestamped name
        #[arg(long)]
        title: Option<String>,
        /// Viewport size as WIDTHxHEIGHT
        #[arg(long, default_value = "1280x720")]
        viewport: String,
        /// Upper bound on the per-tile settle wait, in milliseconds
        #[arg(long, default_value_t = 150)]
        settle_ms: u64,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Capture {
            url,
            out,
            viewport,
            settle_ms,
            single,
        } => {
            let viewport = parse_viewport(&viewport)?;
            let png = capture_page(&url, viewport, settle_ms, single)?;
            std::fs::write(&out, &png)?;
            println!("Saved {} ({} bytes)", out, png.len());
            Ok(())
        }

        #[cfg(feature = "upload")]
        Commands::Projects {
            server,
            email,
            password,
        } => {
            let client = pagestitch::client::PresentatorClient::new(&server)?;
            let session = client.authenticate(&email, &password)?;
            for project in client.list_projects(&session)? {
                println!("{}  {}", project.id, project.title);
            }
            Ok(())
        }

        #[cfg(feature = "upload")]
        Commands::Prototypes {
            server,
            email,
            password,
            project,
        } => {
            let client = pagestitch::client::PresentatorClient::new(&server)?;
            let session = client.authenticate(&email, &password)?;
            for prototype in client.list_prototypes(&session, &project)? {
                println!("{}  {}", prototype.id, prototype.title);
            }
            Ok(())
        }

        #[cfg(feature = "upload")]
        Commands::Upload {
            url,
            server,
            email,
            password,
            prototype,
            title,
            viewport,
            settle_ms,
        } => {
            let viewport = parse_viewport(&viewport)?;
            let png = capture_page(&url, viewport, settle_ms, false)?;

            let title = title.unwrap_or_else(default_title);
            let client = pagestitch::client::PresentatorClient::new(&server)?;
            let session = client.authenticate(&email, &password)?;
            let screen = client.upload_screen(&session, &prototype, &title, png)?;
            println!("Uploaded screen {} ({})", screen.id, screen.title);
            Ok(())
        }
    }
}

fn parse_viewport(s: &str) -> anyhow::Result<pagestitch::Viewport> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| anyhow::anyhow!("viewport must look like 1280x720, got '{}'", s))?;
    Ok(pagestitch::Viewport {
        width: w.trim().parse()?,
        height: h.trim().parse()?,
    })
}

#[cfg(feature = "upload")]
fn default_title() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("Screenshot-{}", secs)
}

#[cfg(feature = "cdp")]
fn capture_page(
    url: &str,
    viewport: pagestitch::Viewport,
    settle_ms: u64,
    single: bool,
) -> pagestitch::Result<Vec<u8>> {
    use pagestitch::cdp::CdpSession;
    use pagestitch::{CancelToken, CaptureConfig, PageSession, SessionConfig};

    let config = SessionConfig {
        viewport,
        ..Default::default()
    };
    let mut session = CdpSession::new(config)?;
    session.goto(url)?;

    let png = if single {
        session.capture_viewport()?
    } else {
        let capture_config = CaptureConfig {
            settle_ms,
            ..Default::default()
        };
        match session.capture_full_page(&capture_config, &CancelToken::new()) {
            Ok(png) => png,
            // Full-page stitching unavailable for this page; fall back to a
            // plain viewport shot.
            Err(e) => {
                eprintln!("Full-page capture failed ({}), falling back to viewport capture", e);
                session.capture_viewport()?
            }
        }
    };

    session.close()?;
    Ok(png)
}

#[cfg(not(feature = "cdp"))]
fn capture_page(
    _url: &str,
    _viewport: pagestitch::Viewport,
    _settle_ms: u64,
    _single: bool,
) -> pagestitch::Result<Vec<u8>> {
    Err(pagestitch::Error::ConfigError(
        "built without the `cdp` feature; no capture backend available".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_viewport_flag() {
        let v = parse_viewport("1900x1000").unwrap();
        assert_eq!((v.width, v.height), (1900, 1000));
        assert!(parse_viewport("1900").is_err());
    }
}
