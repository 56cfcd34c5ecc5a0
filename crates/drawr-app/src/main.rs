//! Native command-line client.
//!
//! Creates or joins a session and mirrors every stroke into a headless Vello
//! scene, logging the traffic.

#[cfg(feature = "native")]
mod cli {
    use clap::{Parser, Subcommand};
    use drawr_app::Whiteboard;
    use drawr_core::{
        ClientConfig, ClientError, ClientEvent, ClientEventKind, DrawingSurface, HeadlessHost,
        HttpSessionApi, PlatformWebSocket, SessionClient, SessionState, SurfaceConfig,
        SurfaceError,
    };
    use drawr_render::SceneTarget;
    use kurbo::Size;
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    pub enum CliError {
        #[error("surface error: {0}")]
        Surface(#[from] SurfaceError),
        #[error("session error: {0}")]
        Client(#[from] ClientError),
    }

    #[derive(Parser, Debug)]
    #[command(name = "drawr", about = "Drawr whiteboard session client")]
    pub struct Cli {
        #[arg(long, env = "DRAWR_HOST", default_value = "localhost")]
        host: String,

        #[arg(long, env = "DRAWR_PORT", default_value_t = 3000)]
        port: u16,

        /// Use https/wss.
        #[arg(long, env = "DRAWR_SECURE")]
        secure: bool,

        #[arg(long, env = "DRAWR_USER", default_value = "drawr-cli")]
        user: String,

        /// Canvas width in pixels.
        #[arg(long, default_value_t = 800.0)]
        width: f64,

        /// Canvas height in pixels.
        #[arg(long, default_value_t = 600.0)]
        height: f64,

        /// Polling interval in milliseconds.
        #[arg(long, default_value_t = 50)]
        poll_ms: u64,

        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand, Debug)]
    enum Command {
        /// Create a new session.
        New { name: String },
        /// Join an existing session.
        Join { session_id: String },
    }

    type Board = Whiteboard<HeadlessHost<SceneTarget>, HttpSessionApi, PlatformWebSocket>;

    fn log_session_events(board: &mut Board) {
        let client = board.client_mut();
        client.subscribe(ClientEventKind::NewUser, |event| {
            if let ClientEvent::NewUser(user) = event {
                log::info!("User joined: {user}");
            }
        });
        client.subscribe(ClientEventKind::NewPeer, |event| {
            if let ClientEvent::NewPeer(peer) = event {
                log::info!("New peer: {peer}");
            }
        });
        client.subscribe(ClientEventKind::ServerDown, |event| {
            if let ClientEvent::ServerDown(data) = event {
                log::warn!("Server going down: {data}");
            }
        });
        client.subscribe(ClientEventKind::UpdateCanvas, |event| {
            if let ClientEvent::UpdateCanvas { username, points } = event {
                let from = username.as_deref().unwrap_or("anonymous");
                log::info!("{from} drew {} points", points.len());
            }
        });
        client.subscribe(ClientEventKind::ProtocolError, |event| {
            if let ClientEvent::ProtocolError { message } = event {
                log::warn!("Dropped malformed frame: {message}");
            }
        });
    }

    pub async fn run(cli: Cli) -> Result<(), CliError> {
        let config = ClientConfig::new(cli.host, cli.port).secure(cli.secure);
        let host = HeadlessHost::<SceneTarget>::new(Size::new(cli.width, cli.height));
        let surface = DrawingSurface::new(host, SurfaceConfig::default())?;
        let client = SessionClient::new(
            cli.user,
            config,
            HttpSessionApi::new(),
            PlatformWebSocket::new(),
        );
        let mut board = Whiteboard::new(surface, client);
        log_session_events(&mut board);

        let id = match &cli.command {
            Command::New { name } => board.new_session(name).await?,
            Command::Join { session_id } => board.join_session(session_id).await?,
        };
        log::info!("Connected to session {id}; others can join with `drawr join {id}`");

        let mut ticker = tokio::time::interval(Duration::from_millis(cli.poll_ms.max(1)));
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let stats = board.pump();
                    if stats.remote_batches > 0 {
                        log::debug!(
                            "Scene holds {} segments",
                            board.surface().target().segment_count()
                        );
                    }
                    match board.client().state() {
                        SessionState::Closed | SessionState::Disconnected => break,
                        _ => {}
                    }
                }
                _ = &mut shutdown => {
                    log::info!("Interrupted, closing session");
                    board.client_mut().close();
                    break;
                }
            }
        }

        log::info!(
            "Session ended with {} stroke points on the canvas",
            board.surface().strokes().len()
        );
        Ok(())
    }
}

#[cfg(feature = "native")]
#[tokio::main(flavor = "current_thread")]
async fn main() {
    use clap::Parser;

    env_logger::init();
    log::info!("Starting Drawr");

    if let Err(e) = cli::run(cli::Cli::parse()).await {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
