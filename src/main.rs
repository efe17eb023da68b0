use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use liarparty::cache::{self, ThemeCache};
use liarparty::catalog::{Catalog, HttpCatalog, MemoryCatalog};
use liarparty::config::GameConfig;
use liarparty::reveal::{RevealEvent, RevealPhase, RevealScreen, ScreenInput, ScreenUpdate};
use liarparty::session::{GuessOutcome, SessionController, Verdict, VoteTally};
use liarparty::types::{SessionMode, Theme};

type Input = Lines<BufReader<Stdin>>;

/// The terminal is the single "pointer" holding the reveal control
const KEYBOARD: u32 = 0;

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liarparty=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = GameConfig::from_env();
    tracing::info!("Starting with {:?}", config);

    let catalog = match build_catalog(&config).await {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Could not set up the word catalog: {}", e);
            std::process::exit(1);
        }
    };

    // Keep the theme list fresh in the background while people play
    let themes = ThemeCache::themes();
    let _sync = cache::spawn_theme_sync(themes.clone(), catalog.clone(), config.sync_interval);

    let controller = SessionController::new(catalog.clone());
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    println!("Find the Liar! Pass the device around; one of you does not know the word.");
    while play_round(&config, &controller, &themes, catalog.as_ref(), &mut input)
        .await
        .is_some()
    {
        controller.return_to_lobby().await;
        match ask(&mut input, "\nPlay again? [Y/n] ").await {
            Some(answer) if answer.eq_ignore_ascii_case("n") => break,
            Some(_) => continue,
            None => break,
        }
    }
    println!("Bye!");
}

async fn build_catalog(config: &GameConfig) -> Result<Arc<dyn Catalog>, String> {
    if let Some(url) = &config.catalog_url {
        tracing::info!("Using theme service at {}", url);
        return HttpCatalog::new(url.clone())
            .map(|c| Arc::new(c) as Arc<dyn Catalog>)
            .map_err(|e| e.to_string());
    }
    if let Some(path) = &config.catalog_file {
        return MemoryCatalog::load(path)
            .await
            .map(|c| Arc::new(c) as Arc<dyn Catalog>)
            .map_err(|e| e.to_string());
    }
    Ok(Arc::new(MemoryCatalog::with_defaults()))
}

/// Read one trimmed line; None on end of input
async fn ask(input: &mut Input, prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = std::io::stdout().flush();
    match input.next_line().await {
        Ok(Some(line)) => Some(line.trim().to_string()),
        Ok(None) => None,
        Err(e) => {
            tracing::error!("Failed to read input: {}", e);
            None
        }
    }
}

async fn ask_number(input: &mut Input, prompt: &str, max: usize) -> Option<usize> {
    loop {
        let answer = ask(input, prompt).await?;
        match answer.parse::<usize>() {
            Ok(n) if n <= max => return Some(n),
            _ => println!("Please enter a number up to {}.", max),
        }
    }
}

async fn pick_theme(
    themes: &ThemeCache,
    catalog: &dyn Catalog,
    input: &mut Input,
) -> Option<Theme> {
    loop {
        if themes.items().is_empty() {
            if let Err(e) = themes.refresh_from(catalog).await {
                println!("Could not load themes ({}).", e);
                ask(input, "Press Enter to retry.").await?;
                continue;
            }
        }

        let items = themes.items();
        if items.is_empty() {
            println!("The catalog has no themes yet.");
            return None;
        }
        for (i, theme) in items.iter().enumerate() {
            println!("  {}) {}", i + 1, theme.name);
        }
        let choice = ask_number(input, "Theme: ", items.len()).await?;
        if let Some(theme) = choice.checked_sub(1).and_then(|i| items.get(i)) {
            return Some(theme.clone());
        }
    }
}

async fn play_round(
    config: &GameConfig,
    controller: &SessionController,
    themes: &ThemeCache,
    catalog: &dyn Catalog,
    input: &mut Input,
) -> Option<()> {
    let setup = loop {
        let players = ask_number(input, "How many players? ", 32).await?;
        match config.setup(players) {
            Ok(setup) => break setup,
            Err(e) => println!("{}", e),
        }
    };

    loop {
        let theme = pick_theme(themes, catalog, input).await?;
        println!("Loading words...");
        match controller
            .start(SessionMode::NewGame { theme_id: theme.id }, &setup)
            .await
        {
            Ok(_) => break,
            Err(e) => println!("Cannot start a game with '{}': {}", theme.name, e),
        }
    }

    loop {
        run_reveal(config, controller, input).await?;
        let answer = ask(input, "Everyone ready? [Enter] discuss, [r] replay the reveal: ").await?;
        if !answer.eq_ignore_ascii_case("r") {
            break;
        }
        if let Err(e) = controller.start(SessionMode::Replay, &setup).await {
            println!("{}", e);
            break;
        }
    }

    let discussion = match controller.begin_discussion().await {
        Ok(discussion) => discussion,
        Err(e) => {
            println!("{}", e);
            return Some(());
        }
    };

    println!("\nDiscuss! Then everyone votes for the player they think is the liar.");
    let mut votes = Vec::with_capacity(discussion.player_count);
    for voter in 0..discussion.player_count {
        let prompt = format!("Player {} votes for player #: ", voter + 1);
        loop {
            let vote = ask_number(input, &prompt, discussion.player_count).await?;
            if vote >= 1 {
                votes.push(vote - 1);
                break;
            }
        }
    }

    let accused = match discussion.tally_votes(&votes) {
        Ok(VoteTally::Leader { player, votes }) => {
            println!("Player {} got {} votes.", player + 1, votes);
            player
        }
        Ok(VoteTally::Tie { players, .. }) => {
            let names: Vec<String> = players.iter().map(|p| (p + 1).to_string()).collect();
            println!("Tie between players {}. The liar escapes!", names.join(", "));
            println!("The liar was player {}; the word was {}.", discussion.liar_index + 1, discussion.word);
            return Some(());
        }
        Ok(VoteTally::NoVotes) | Err(_) => return Some(()),
    };

    match discussion.accuse(accused) {
        Ok(Verdict::LiarCaught { liar }) => {
            println!("Caught! Player {} was the liar. Last chance to guess the word:", liar + 1);
            for (i, option) in discussion.guess_options().iter().enumerate() {
                println!("  {}) {}", i + 1, option);
            }
            let choice = loop {
                let n = ask_number(input, "Guess: ", discussion.candidates.len()).await?;
                if n >= 1 {
                    break n - 1;
                }
            };
            match discussion.liar_guess(&discussion.candidates[choice]) {
                Ok(GuessOutcome::LiarWins) => println!("Correct, the liar wins anyway!"),
                Ok(GuessOutcome::LiarLoses) => {
                    println!("Wrong! The word was {}. Everyone else wins.", discussion.word)
                }
                Err(e) => println!("{}", e),
            }
        }
        Ok(Verdict::WrongPlayer { accused, .. }) => {
            println!(
                "Player {} was innocent. The liar (player {}) wins! The word was {}.",
                accused + 1,
                discussion.liar_index + 1,
                discussion.word
            );
        }
        Err(e) => println!("{}", e),
    }
    Some(())
}

/// One pass over all players. Enter starts holding, Enter again releases.
async fn run_reveal(
    config: &GameConfig,
    controller: &SessionController,
    input: &mut Input,
) -> Option<()> {
    let store = controller.session_store();
    let mut screen = RevealScreen::spawn(store.clone(), config.reveal_threshold, config.tick_interval);
    let hold_for = config.reveal_threshold.as_millis();

    let result = async {
        while let Some(state) = store.get().filter(|s| !s.all_revealed()) {
            let player = state.current_player + 1;
            ask(
                input,
                &format!(
                    "\nPlayer {}, take the device. Press Enter to hold ({} ms), Enter again to release.",
                    player, hold_for
                ),
            )
            .await?;
            screen.send(ScreenInput::PressStart { pointer: KEYBOARD }).await;

            // Show progress until the player presses Enter again
            loop {
                tokio::select! {
                    line = input.next_line() => {
                        line.ok().flatten()?;
                        screen.send(ScreenInput::PressEnd { pointer: KEYBOARD }).await;
                        break;
                    }
                    update = screen.next_update() => match update? {
                        ScreenUpdate::Progress { progress, .. } => {
                            let filled = (progress * 20.0).round() as usize;
                            print!("\r[{}{}]", "#".repeat(filled), ".".repeat(20 - filled));
                            let _ = std::io::stdout().flush();
                        }
                        ScreenUpdate::Event(RevealEvent::ContentShown { payload, .. }) => {
                            print!("\r  >>> {} <<<  (release with Enter)", payload.text());
                            let _ = std::io::stdout().flush();
                        }
                        ScreenUpdate::Event(_) => {}
                    }
                }
            }

            // Wait for the verdict on the release
            loop {
                match screen.next_update().await? {
                    ScreenUpdate::Event(RevealEvent::Advanced { next, .. }) => {
                        // Push the word off screen before handing the device on
                        print!("\r{}\r", " ".repeat(60));
                        if next == RevealPhase::AllRevealed {
                            println!("\nEveryone has seen their role.");
                        }
                        break;
                    }
                    ScreenUpdate::Event(RevealEvent::PressAborted { .. }) => {
                        println!("\nHold a bit longer!");
                        break;
                    }
                    _ => {}
                }
            }
        }
        Some(())
    }
    .await;

    screen.close().await;
    result
}
