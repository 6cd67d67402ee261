use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use clap::Parser as ClapParser;
use gopiler_web::{router, AppState};

/// `-e` toggles binding to all interfaces instead of loopback only
/// (spec.md §6: "Default bind is loopback; an `-e` flag exposes on all
/// interfaces, port 8080").
#[derive(Debug, ClapParser)]
#[command(name = "gopiler-web", about = "HTTP front end for the GOPILER compiler")]
struct Cli {
    #[arg(short = 'e', long = "expose", default_value_t = false)]
    expose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let host = if cli.expose {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    } else {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    };
    let addr = SocketAddr::from((host, 8080));

    if cli.expose {
        tracing::info!("Web server exposed to internet; {addr}");
    } else {
        tracing::info!("Web server running on localhost; {addr}");
    }

    let state = Arc::new(AppState::new());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
