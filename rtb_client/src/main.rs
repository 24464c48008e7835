//! A terminal client for Ride the Bus lobbies.
//!
//! The client opens or joins a lobby over HTTP, keeps the push channel open
//! in the background and redraws the table on every snapshot. Commands are
//! typed on stdin.

use anyhow::{Context, Result};
use pico_args::Arguments;
use ride_the_bus::{PlayerId, SessionSnapshot, project};
use rtb_client::{
    api_client::ApiClient,
    commands::{ClientCommand, parse_command},
    websocket_client::{WebSocketClient, render_view},
};
use std::{collections::BTreeMap, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

const HELP: &str = "\
Play Ride the Bus from a terminal

USAGE:
  rtb_client [OPTIONS]

OPTIONS:
  --server URL          Server URL  [default: http://localhost:3000]
  --lobby CODE          Lobby code to join
  --name NAME           Display name  [default: your login name]
  --player-id ID        Rejoin as a player id handed out earlier
  --host                Open a new lobby and act as its host screen

FLAGS:
  -h, --help            Print help information
";

const COMMANDS: &str = "\
Commands:
  red | black | higher | lower | between | outside | hearts | diamonds | clubs | spades
  give NICK COUNT [NICK COUNT ...]   hand out sips
  tap                                tap out after this round
  start | restart | close            host only
  show | help | quit";

struct Args {
    server_url: String,
    lobby: Option<String>,
    name: Option<String>,
    player_id: Option<PlayerId>,
    host: bool,
}

/// Who this terminal is inside the lobby
struct Seat {
    code: String,
    player_id: PlayerId,
    name: String,
    is_host: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        server_url: pargs
            .value_from_str("--server")
            .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        lobby: pargs.opt_value_from_str("--lobby")?,
        name: pargs.opt_value_from_str("--name")?,
        player_id: pargs
            .opt_value_from_str::<_, String>("--player-id")?
            .map(PlayerId::from),
        host: pargs.contains("--host"),
    };

    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let api_client = ApiClient::new(args.server_url.clone());
    let seat = take_seat(&api_client, &args).await?;

    let ws_url = api_client.websocket_url(&seat.code, Some((&seat.player_id, &seat.name)))?;
    let (snapshot_tx, mut snapshot_rx) = mpsc::channel::<Arc<SessionSnapshot>>(16);
    let push = WebSocketClient::new(ws_url).spawn(snapshot_tx);

    println!("{COMMANDS}");

    let mut latest: Option<Arc<SessionSnapshot>> = None;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Some(snapshot) = snapshot_rx.recv() => {
                redraw(&snapshot, &seat);
                latest = Some(snapshot);
            }
            line = stdin.next_line() => {
                let Some(line) = line.context("Error reading input")? else {
                    break; // EOF
                };
                if line.trim().is_empty() {
                    continue;
                }

                match parse_command(&line) {
                    Ok(ClientCommand::Quit) => {
                        println!("Disconnecting...");
                        break;
                    }
                    Ok(ClientCommand::Help) => println!("{COMMANDS}"),
                    Ok(ClientCommand::Show) => match &latest {
                        Some(snapshot) => redraw(snapshot, &seat),
                        None => println!("No snapshot yet"),
                    },
                    Ok(command) => {
                        if let Err(e) = execute(&api_client, &seat, latest.as_deref(), command).await {
                            eprintln!("Error: {e:#}");
                        }
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
        }
    }

    push.abort();
    println!("\nLeft lobby {}. Rejoin with --lobby {} --player-id {}", seat.code, seat.code, seat.player_id);
    Ok(())
}

/// Open a lobby as host or join an existing one
async fn take_seat(api_client: &ApiClient, args: &Args) -> Result<Seat> {
    if args.host {
        let created = api_client.create_lobby(args.name.as_deref()).await?;
        let name = created
            .session
            .player(&created.host_id)
            .map(|p| p.name.clone())
            .context("Host missing from new lobby")?;
        println!("Lobby {} is open. Players join with --lobby {}", created.code, created.code);
        return Ok(Seat {
            code: created.code,
            player_id: created.host_id,
            name,
            is_host: true,
        });
    }

    let code = args
        .lobby
        .clone()
        .context("Pass --lobby CODE to join, or --host to open a lobby")?;
    let name = args.name.clone().unwrap_or_else(whoami::username);

    let joined = api_client
        .join(&code, &name, args.player_id.as_ref())
        .await?;
    let name = joined
        .session
        .player(&joined.player_id)
        .map(|p| p.name.clone())
        .unwrap_or(name);
    println!("Joined {} as {} ({})", joined.session.code, name, joined.player_id);

    Ok(Seat {
        code: joined.session.code,
        player_id: joined.player_id,
        name,
        is_host: false,
    })
}

fn redraw(snapshot: &SessionSnapshot, seat: &Seat) {
    // Clear screen and move cursor to top
    print!("\x1B[2J\x1B[1;1H");
    let me = (!seat.is_host).then_some(&seat.player_id);
    println!("{}", render_view(&project(snapshot), me));
}

async fn execute(
    api_client: &ApiClient,
    seat: &Seat,
    latest: Option<&SessionSnapshot>,
    command: ClientCommand,
) -> Result<()> {
    let code = &seat.code;
    let me = &seat.player_id;

    match command {
        ClientCommand::Guess(guess) => {
            let round = latest.map(|s| s.game.round).filter(|r| *r > 0);
            api_client
                .submit_choice(code, me, guess.as_str(), round)
                .await?;
        }
        ClientCommand::Give(pairs) => {
            let snapshot = latest.context("No snapshot yet")?;
            let allocations = resolve_allocations(snapshot, &pairs)?;
            api_client.submit_distribution(code, me, &allocations).await?;
        }
        ClientCommand::TapOut => {
            api_client.request_tap_out(code, me).await?;
        }
        ClientCommand::Start => {
            api_client.start_game(code, me).await?;
        }
        ClientCommand::Restart => {
            api_client.restart_game(code, me).await?;
        }
        ClientCommand::Close => {
            api_client.close_lobby(code, me).await?;
        }
        ClientCommand::Show | ClientCommand::Help | ClientCommand::Quit => {}
    }
    Ok(())
}

/// Map typed nicknames onto player ids, earliest joiner first
fn resolve_allocations(
    snapshot: &SessionSnapshot,
    pairs: &[(String, u32)],
) -> Result<BTreeMap<PlayerId, u32>> {
    let mut allocations = BTreeMap::new();
    for (nickname, sips) in pairs {
        let player = snapshot
            .players
            .iter()
            .filter(|p| p.id != snapshot.host_id)
            .find(|p| p.name.eq_ignore_ascii_case(nickname))
            .with_context(|| format!("No player called '{nickname}'"))?;
        let total = allocations.entry(player.id.clone()).or_insert(0u32);
        *total = total
            .checked_add(*sips)
            .with_context(|| format!("Too many sips for '{nickname}'"))?;
    }
    Ok(allocations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ride_the_bus::{Player, Session};

    fn lobby() -> (SessionSnapshot, PlayerId, PlayerId) {
        let host = Player::new(PlayerId::host(), "TV".to_string());
        let mut session = Session::new("BRAVE-OTTER-JUMPS".to_string(), host, Utc::now());
        let settings = Default::default();
        let alice = session.join("alice", None, &settings).unwrap();
        let bob = session.join("Bob", None, &settings).unwrap();
        (session.snapshot(), alice, bob)
    }

    #[test]
    fn test_resolve_allocations_merges_repeats() {
        let (snapshot, alice, bob) = lobby();
        let pairs = vec![
            ("bob".to_string(), 2),
            ("ALICE".to_string(), 1),
            ("Bob".to_string(), 3),
        ];

        let allocations = resolve_allocations(&snapshot, &pairs).unwrap();
        assert_eq!(allocations, BTreeMap::from([(alice, 1), (bob, 5)]));
    }

    #[test]
    fn test_resolve_allocations_unknown_or_host() {
        let (snapshot, _, _) = lobby();
        let err = resolve_allocations(&snapshot, &[("TV".to_string(), 2)]).unwrap_err();
        assert_eq!(err.to_string(), "No player called 'TV'");
    }

    #[test]
    fn test_resolve_allocations_overflow() {
        let (snapshot, _, _) = lobby();
        let pairs = vec![("bob".to_string(), u32::MAX), ("bob".to_string(), 1)];

        let err = resolve_allocations(&snapshot, &pairs).unwrap_err();
        assert_eq!(err.to_string(), "Too many sips for 'bob'");
    }
}
