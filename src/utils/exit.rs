use colored::*;
use rand::Rng;

/// Picks a closing banner line. Purely cosmetic CLI texture, grounded on the
/// prior `get_exit_message` — the randomizer now runs on `rand` instead of
/// a bare `getrandom` call, matching the rest of the host's stack.
pub fn get_exit_message() -> String
{
        let messages = [
                ("Visualizer host shut down cleanly.", "green"),
                ("All engines torn down, contexts released.", "cyan"),
                ("Session ended; parameters held in memory are gone.", "yellow"),
                ("Window closed. Nothing left running.", "blue"),
                ("Exiting. No engines, no contexts, no drama.", "white"),
        ];

        let choice = rand::rng().random_range(0..messages.len());
        let (message, color) = messages[choice];

        match color
        {
                "green" => message.green().to_string(),
                "cyan" => message.cyan().to_string(),
                "yellow" => message.yellow().to_string(),
                "blue" => message.blue().to_string(),
                "white" => message.white().to_string(),
                _ => message.to_string(),
        }
}
