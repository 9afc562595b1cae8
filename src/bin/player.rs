use anyhow::{Context, Result};
use clap::Parser;
use music_deck::player::audio::RodioOutput;
use music_deck::player::browser::LoadResult;
use music_deck::player::catalog::{AuthClient, Catalog, HttpCatalog};
use music_deck::player::session::{Input, NewLocalArtist, Outcome, Session};
use music_deck::player::{Artist, Playback};
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

type PlayerSession = Session<RodioOutput>;
type InputLines = Lines<BufReader<Stdin>>;
/// Track list fetch for the most recently opened artist
type PendingLoad = Pin<Box<dyn Future<Output = LoadResult> + Send>>;

#[derive(Parser)]
#[command(name = "deck-player")]
#[command(about = "Music Deck terminal player", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(short, long, env = "MUSIC_DECK_SERVER", default_value = "http://localhost:3000")]
    server: String,
}

#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Artists,
    Refresh,
    Open(usize),
    Tracks,
    Play(usize),
    Toggle,
    Next,
    Previous,
    Seek(f64),
    Status,
    Search(String),
    Add(NewLocalArtist),
    Remove(usize),
    Signup {
        name: String,
        email: String,
        password: String,
    },
    Login {
        email: String,
        password: String,
    },
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let number = |what: &str| -> Result<usize, String> {
        match rest.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(format!("Usage: {} <number>", what)),
        }
    };

    match word {
        "help" | "?" => Ok(Command::Help),
        "artists" | "ls" => Ok(Command::Artists),
        "refresh" => Ok(Command::Refresh),
        "open" | "o" => number("open").map(Command::Open),
        "tracks" => Ok(Command::Tracks),
        "play" => number("play").map(Command::Play),
        "p" | "toggle" | "pause" => Ok(Command::Toggle),
        "next" | "n" => Ok(Command::Next),
        "prev" | "previous" | "b" => Ok(Command::Previous),
        "seek" => rest
            .trim_end_matches('%')
            .parse::<f64>()
            .map(Command::Seek)
            .map_err(|_| "Usage: seek <percent>".to_string()),
        "status" | "s" => Ok(Command::Status),
        "search" | "/" => Ok(Command::Search(rest.to_string())),
        "add" => Ok(Command::Add(NewLocalArtist::parse(rest))),
        "rm" | "delete" => number("rm").map(Command::Remove),
        "signup" => match rest.split_whitespace().collect::<Vec<_>>()[..] {
            [name, email, password] => Ok(Command::Signup {
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            }),
            _ => Err("Usage: signup <name> <email> <password>".to_string()),
        },
        "login" => match rest.split_whitespace().collect::<Vec<_>>()[..] {
            [email, password] => Ok(Command::Login {
                email: email.to_string(),
                password: password.to_string(),
            }),
            _ => Err("Usage: login <email> <password>".to_string()),
        },
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("Unknown command: {} (try 'help')", other)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr and stay quiet by default so they don't clobber the prompt
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let catalog: Arc<dyn Catalog> = Arc::new(HttpCatalog::new(&cli.server)?);
    let auth = AuthClient::new(&cli.server)?;
    let audio = RodioOutput::new()?;
    let mut session = Session::new(catalog, audio);

    println!("🎧 Music Deck player ({})", cli.server);
    println!("{:-<80}", "");
    match session.start().await {
        Ok(_) => print_artists(&session),
        Err(e) => println!("⚠️  Could not load artists: {}", e),
    }
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let mut pending: Option<PendingLoad> = None;

    prompt();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                if line.trim().is_empty() {
                    prompt();
                    continue;
                }
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        run_command(&mut session, &auth, &mut lines, &mut pending, command).await?
                    }
                    Err(usage) => println!("{}", usage),
                }
                prompt();
            }
            loaded = wait_for(&mut pending) => {
                pending = None;
                if session.apply_load(loaded) {
                    println!();
                    print_pane(&session);
                    prompt();
                }
            }
            _ = ticker.tick() => {
                session.handle(Input::Tick).await;
            }
        }
    }

    println!("\n👋 Bye");
    Ok(())
}

/// Resolves with the pending fetch, or never if there is none
async fn wait_for(pending: &mut Option<PendingLoad>) -> LoadResult {
    match pending.as_mut() {
        Some(load) => load.await,
        None => std::future::pending().await,
    }
}

async fn run_command(
    session: &mut PlayerSession,
    auth: &AuthClient,
    lines: &mut InputLines,
    pending: &mut Option<PendingLoad>,
    command: Command,
) -> Result<()> {
    let outcome = match command {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Artists => {
            print_artists(session);
            return Ok(());
        }
        Command::Refresh => {
            match session.browser_mut().refresh_artists().await {
                Ok(_) => print_artists(session),
                Err(e) => println!("⚠️  Could not load artists: {}", e),
            }
            return Ok(());
        }
        Command::Tracks => {
            print_pane(session);
            return Ok(());
        }
        Command::Status => {
            print_status(session);
            return Ok(());
        }
        Command::Open(n) => {
            let request = nth_artist(session, n)
                .and_then(|artist| session.browser_mut().begin_load(artist.id));
            match request {
                Some(request) => {
                    println!("Loading songs for {}...", request.artist().name);
                    // Replacing the previous fetch drops it; its result would be stale anyway
                    *pending = Some(Box::pin(request.run(session.browser().catalog())));
                }
                None => println!("No artist #{}", n),
            }
            return Ok(());
        }
        Command::Play(n) => session.handle(Input::SelectTrack(n - 1)).await,
        Command::Toggle => session.handle(Input::TogglePlayPause).await,
        Command::Next => session.handle(Input::Next).await,
        Command::Previous => session.handle(Input::Previous).await,
        Command::Seek(percent) => {
            session.handle(Input::Seek(percent)).await;
            print_status(session);
            return Ok(());
        }
        Command::Search(query) => {
            session.handle(Input::Search(query)).await;
            print_artists(session);
            if session.pane().artist().is_some() {
                print_pane(session);
            }
            return Ok(());
        }
        Command::Add(new) => session.handle(Input::AddLocalArtist(new)).await,
        Command::Remove(n) => {
            let Some(artist) = nth_artist(session, n) else {
                println!("No artist #{}", n);
                return Ok(());
            };
            print!("Delete artist \"{}\"? [y/N] ", artist.name);
            std::io::stdout().flush().ok();
            let answer = lines.next_line().await?.unwrap_or_default();
            let confirmed = matches!(answer.trim(), "y" | "Y" | "yes");
            session
                .handle(Input::RemoveArtist {
                    id: artist.id,
                    confirmed,
                })
                .await
        }
        Command::Signup {
            name,
            email,
            password,
        } => {
            match auth.signup(&name, &email, &password).await {
                Ok(reply) => println!("{}", reply.msg),
                Err(e) => println!("⚠️  {:#}", e),
            }
            return Ok(());
        }
        Command::Login { email, password } => {
            match auth.login(&email, &password).await {
                Ok(reply) => {
                    println!("{}", reply.msg);
                    if let Some(token) = reply.token {
                        println!("Token: {}", token);
                    }
                }
                Err(e) => println!("⚠️  {:#}", e),
            }
            return Ok(());
        }
        Command::Quit => return Ok(()),
    };

    report(session, lines, outcome).await
}

async fn report(session: &PlayerSession, lines: &mut InputLines, outcome: Outcome) -> Result<()> {
    match outcome {
        Outcome::Idle => {}
        Outcome::Playing(Playback::Streaming { track, .. }) => {
            println!("▶️  Now playing: {}", track);
        }
        Outcome::Playing(Playback::Local { track }) => {
            println!("🎶 Playing local song: {}", track);
        }
        Outcome::Toggled { playing: true } => println!("▶️  Resumed"),
        Outcome::Toggled { playing: false } => println!("⏸  Paused"),
        Outcome::TracksShown => print_pane(session),
        Outcome::ArtistAdded(_) => {
            println!("✓ Artist added");
            print_artists(session);
        }
        Outcome::ArtistRemoved => {
            println!("✓ Artist removed");
            print_artists(session);
        }
        Outcome::Warning(e) => {
            print!("⚠️  {} (press Enter) ", e);
            std::io::stdout().flush().ok();
            lines.next_line().await?;
        }
    }
    Ok(())
}

fn nth_artist(session: &PlayerSession, n: usize) -> Option<Artist> {
    session.browser().artists().nth(n.checked_sub(1)?).cloned()
}

fn print_artists(session: &PlayerSession) {
    let browser = session.browser();
    if browser.artists().next().is_none() {
        println!("No artists yet. Add one with: add <name> | <song>, <song>");
        return;
    }

    match browser.query() {
        "" => println!("Artists:"),
        query => println!("Artists matching \"{}\":", query),
    }
    for (idx, artist) in browser.artists().enumerate() {
        if !browser.is_visible(artist) {
            continue;
        }
        let tag = if artist.is_local() { "  (local)" } else { "" };
        println!("  {:>2}. {}{}", idx + 1, artist.name, tag);
    }
}

fn print_pane(session: &PlayerSession) {
    let pane = session.pane();
    let Some(artist) = pane.artist() else {
        println!("No artist selected. Use: open <number>");
        return;
    };

    println!("🎤 {}", artist.name);
    println!("{:-<80}", "");
    if let Some(text) = pane.placeholder() {
        println!("  {}", text);
        return;
    }
    for row in session.track_rows().iter().filter(|row| row.visible) {
        let marker = if row.now_playing { "▶" } else { " " };
        println!(" {} {:>2}. 🎵 {}", marker, row.index + 1, row.name);
    }
}

fn print_status(session: &PlayerSession) {
    let controller = session.controller();
    let Some(track) = controller
        .now_playing()
        .and_then(|index| controller.tracks().get(index))
    else {
        println!("Nothing selected");
        return;
    };

    let progress = controller.progress();
    let filled = (progress.percent / 100.0 * 30.0).round() as usize;
    println!(
        "[{}] {}  [{}{}] {}",
        controller.affordance().icon(),
        track,
        "#".repeat(filled.min(30)),
        "-".repeat(30 - filled.min(30)),
        progress.timer
    );
}

fn print_help() {
    println!("Commands:");
    println!("  artists                       List artists");
    println!("  refresh                       Reload artists from the server");
    println!("  open <n>                      Show the songs of artist n");
    println!("  tracks                        Show the current song list");
    println!("  play <n>                      Play song n");
    println!("  p                             Play/pause");
    println!("  next, prev                    Next/previous song");
    println!("  seek <percent>                Jump within the song");
    println!("  status                        Show what is playing");
    println!("  search <text>                 Filter artists and songs (empty clears)");
    println!("  add <name> | <song>, <song>   Add a session-only artist");
    println!("  rm <n>                        Remove artist n (server artists return on refresh)");
    println!("  signup <name> <email> <pass>  Create an account");
    println!("  login <email> <pass>          Log in");
    println!("  quit                          Exit");
}

fn prompt() {
    print!("> ");
    std::io::stdout().flush().ok();
}
