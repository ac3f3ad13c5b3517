use chess::{GameEffects, GameResult};

/// Terminal stand-in for sounds: a bell on check and a banner when the game ends.
pub struct TerminalEffects;

impl GameEffects for TerminalEffects {
    fn game_start(&self) {
        tracing::debug!("New game");
    }

    fn check(&self) {
        print!("\x07");
    }

    fn game_over(&self, result: Option<GameResult>) {
        match result {
            Some(result) => println!("*** Game over: {} ***", result),
            None => println!("*** Game over ***"),
        }
    }
}
