//! Console command parsing for the interactive front end.

use hydra_shared::{get_ability_definitions, get_shop_items};

/// A parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Name(String),
    Start,
    /// Zero-based ability slot
    Ability(usize),
    Shop,
    Buy(String),
    Leaderboard,
    Back,
    Next,
    Reset,
    Status,
    Help,
    Quit,
}

/// Parse a console line. Returns None for blank input.
pub fn parse_command(line: &str) -> Option<Result<Command, String>> {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line);
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return None;
    }

    let command = parts[0].to_lowercase();
    let args = &parts[1..];

    Some(match command.as_str() {
        "name" => {
            if args.is_empty() {
                Err("Usage: name <player name>".to_string())
            } else {
                Ok(Command::Name(args.join(" ")))
            }
        }
        "start" | "play" => Ok(Command::Start),
        "ability" | "a" => match args.first() {
            Some(slot) => parse_slot(slot),
            None => Err("Usage: ability <1-3>".to_string()),
        },
        "1" | "2" | "3" => parse_slot(&command),
        "shop" => Ok(Command::Shop),
        "buy" => match args.first() {
            Some(item) => Ok(Command::Buy(item.to_string())),
            None => Err("Usage: buy <item id>".to_string()),
        },
        "leaderboard" | "lb" => Ok(Command::Leaderboard),
        "back" => Ok(Command::Back),
        "next" => Ok(Command::Next),
        "reset" | "retry" => Ok(Command::Reset),
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        _ => Err(format!("Unknown command: {}", command)),
    })
}

fn parse_slot(raw: &str) -> Result<Command, String> {
    let slots = get_ability_definitions().len();
    match raw.parse::<usize>() {
        Ok(slot) if (1..=slots).contains(&slot) => Ok(Command::Ability(slot - 1)),
        _ => Err(format!("Ability slot must be 1-{}", slots)),
    }
}

/// Help text listing commands, abilities and shop items
pub fn help_text() -> String {
    let mut help = String::from("Available commands:\n");
    help.push_str("  name <name>      - Set your player name\n");
    help.push_str("  start            - Start a new run\n");
    help.push_str("  1 / 2 / 3        - Use an ability during battle\n");
    help.push_str("  shop             - Open the shop\n");
    help.push_str("  buy <item>       - Buy an upgrade while in the shop\n");
    help.push_str("  leaderboard      - Show the leaderboard\n");
    help.push_str("  back             - Leave the shop or leaderboard\n");
    help.push_str("  next             - Continue after a victory\n");
    help.push_str("  reset            - Start over from scratch\n");
    help.push_str("  status           - Show hydra stats\n");
    help.push_str("  quit             - Exit\n");

    help.push_str("\nAbilities:\n");
    for (slot, ability) in get_ability_definitions().iter().enumerate() {
        help.push_str(&format!(
            "  [{}] {} {} - {} dmg, {} EP, {:.1}s\n",
            slot + 1,
            ability.icon,
            ability.name,
            ability.base_damage,
            ability.energy_cost,
            ability.cooldown_ms as f64 / 1000.0,
        ));
    }

    help.push_str("\nShop items:\n");
    for item in get_shop_items() {
        help.push_str(&format!("  {:<11} {} - {} ({} tokens)\n", item.id, item.name, item.description, item.cost));
    }

    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("  "), None);
        assert_eq!(parse_command("start"), Some(Ok(Command::Start)));
        assert_eq!(parse_command("/START"), Some(Ok(Command::Start)));
        assert_eq!(parse_command("name  Ann  Lee"), Some(Ok(Command::Name("Ann Lee".into()))));
        assert_eq!(parse_command("buy head-0"), Some(Ok(Command::Buy("head-0".into()))));
        assert_eq!(parse_command("lb"), Some(Ok(Command::Leaderboard)));
    }

    #[test]
    fn test_parse_ability_slots() {
        assert_eq!(parse_command("1"), Some(Ok(Command::Ability(0))));
        assert_eq!(parse_command("ability 3"), Some(Ok(Command::Ability(2))));
        assert!(matches!(parse_command("ability 4"), Some(Err(_))));
        assert!(matches!(parse_command("a zero"), Some(Err(_))));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(parse_command("dance"), Some(Err("Unknown command: dance".to_string())));
    }

    #[test]
    fn test_help_lists_items() {
        let help = help_text();
        assert!(help.contains("Liquidity Blast"));
        assert!(help.contains("max-energy"));
    }
}
